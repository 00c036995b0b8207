/// Tagged value carried by an attribute-store entry. Mirrors the
/// original's 16-byte union: an `int64`, a `float64`, a short string
/// (<=15 bytes), or nothing.
#[derive(Debug, Clone, PartialEq)]
pub enum Cargo {
    Integer(i64),
    Rational(f64),
    Text(String),
    None,
}

/// Maximum byte length of a [`Cargo::Text`] payload.
pub const TEXT_CAPACITY: usize = 15;

impl Cargo {
    pub fn text(s: impl Into<String>) -> Self {
        let mut s = s.into();
        if s.len() > TEXT_CAPACITY {
            s.truncate(TEXT_CAPACITY);
        }
        Cargo::Text(s)
    }

    pub fn discriminant(&self) -> char {
        match self {
            Cargo::Integer(_) => 'i',
            Cargo::Rational(_) => 'r',
            Cargo::Text(_) => '\0',
            Cargo::None => 'n',
        }
    }
}

impl Default for Cargo {
    fn default() -> Self {
        Cargo::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminants_match_the_original_markers() {
        assert_eq!(Cargo::Integer(1).discriminant(), 'i');
        assert_eq!(Cargo::Rational(1.0).discriminant(), 'r');
        assert_eq!(Cargo::None.discriminant(), 'n');
        assert_eq!(Cargo::text("hi").discriminant(), '\0');
    }

    #[test]
    fn text_is_truncated_to_capacity() {
        let c = Cargo::text("012345678901234567890");
        if let Cargo::Text(s) = c {
            assert_eq!(s.len(), TEXT_CAPACITY);
        } else {
            panic!("expected Text");
        }
    }
}
