use gnosis_codec::Identity;

/// Fixed ids of the concepts every `Gnosis` instance is born with. Every
/// entry carries `IMMUTABLE` and `IMMORTAL` from construction; ids are
/// drawn once from the random pool and then hardcoded so unrelated
/// `Gnosis` instances (and dumps taken at different times) agree on them.
macro_rules! congenital {
    ( $( $name:ident = $id:expr ),* $(,)? ) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub struct Congenital {
            $( pub $name: Identity, )*
        }

        impl Congenital {
            pub const fn new() -> Self {
                Congenital {
                    $( $name: $id, )*
                }
            }

            /// Every congenital id together with the name it is bound to.
            pub fn entries(&self) -> Vec<(&'static str, Identity)> {
                vec![ $( (stringify!($name), self.$name), )* ]
            }

            pub fn contains(&self, id: Identity) -> bool {
                $( if self.$name == id { return true; } )*
                false
            }
        }
    };
}

congenital! {
    absorb    = 6_739_698,
    adjective = 4_087_907,
    and       = 374_564,
    attribute = 15_039_847,
    clear     = 2_832_983,
    decr      = 4_930_630,
    diff      = 8_699_352,
    div       = 11_704_920,
    excl      = 2_701_626,
    expl      = 13_421_964,
    forget    = 4_735_681,
    fork      = 11_435_494,
    function  = 15_354_407,
    heritable = 12_454_336,
    iff       = 6_662_231,
    immortal  = 12_888_623,
    immutable = 8_325_804,
    incl      = 14_665_902,
    incr      = 7_036_504,
    integer   = 10_608_339,
    let_      = 9_276_241,
    mult      = 15_984_293,
    mutex     = 1_484_405,
    name      = 2_327_283,
    noun      = 9_807_832,
    operator  = 10_638_075,
    or        = 606_745,
    pop       = 3_107_661,
    prod      = 6_264_904,
    proper    = 556_209,
    quot      = 15_636_372,
    rational  = 7_644_169,
    reference = 2_951_283,
    routine   = 8_222_403,
    rule      = 5_157_699,
    run       = 4_527_056,
    seq       = 532_165,
    sequence  = 2_215_104,
    string    = 5_853_461,
    sum       = 3_491_838,
    swap      = 15_599_439,
    syn       = 2_527_987,
    val       = 12_131_759,
    verb      = 8_829_778,
}

impl Default for Congenital {
    fn default() -> Self {
        Congenital::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique() {
        let c = Congenital::new();
        let ids: HashSet<Identity> = c.entries().into_iter().map(|(_, id)| id).collect();
        assert_eq!(ids.len(), c.entries().len());
    }

    #[test]
    fn contains_recognizes_every_member() {
        let c = Congenital::new();
        for (_, id) in c.entries() {
            assert!(c.contains(id));
        }
        assert!(!c.contains(1));
    }
}
