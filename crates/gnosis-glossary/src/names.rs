use gnosis_codec::Identity;
use gnosis_core::Congenital;

/// The congenital concepts' own names, pre-seeded into every glossary at
/// construction so `known("VERB")` resolves without a prior `let`.
pub fn congenital_names(c: &Congenital) -> [(&'static str, Identity); 44] {
    [
        ("ABSORB", c.absorb),
        ("ADJECTIVE", c.adjective),
        ("AND", c.and),
        ("ATTRIBUTE", c.attribute),
        ("CLEAR", c.clear),
        ("DECR", c.decr),
        ("DIFF", c.diff),
        ("DIV", c.div),
        ("EXCL", c.excl),
        ("EXPL", c.expl),
        ("FORGET", c.forget),
        ("FORK", c.fork),
        ("FUNCTION", c.function),
        ("HERITABLE", c.heritable),
        ("IF", c.iff),
        ("IMMORTAL", c.immortal),
        ("IMMUTABLE", c.immutable),
        ("INCL", c.incl),
        ("INCR", c.incr),
        ("INTEGER", c.integer),
        ("LET", c.let_),
        ("MULT", c.mult),
        ("MUTEX", c.mutex),
        ("NAME", c.name),
        ("NOUN", c.noun),
        ("OPERATOR", c.operator),
        ("OR", c.or),
        ("POP", c.pop),
        ("PROD", c.prod),
        ("PROPER", c.proper),
        ("QUOT", c.quot),
        ("RATIONAL", c.rational),
        ("REF", c.reference),
        ("ROUTINE", c.routine),
        ("RULE", c.rule),
        ("RUN", c.run),
        ("SEQ", c.seq),
        ("SEQUENCE", c.sequence),
        ("STRING", c.string),
        ("SUM", c.sum),
        ("SWAP", c.swap),
        ("SYN", c.syn),
        ("VAL", c.val),
        ("VERB", c.verb),
    ]
}
