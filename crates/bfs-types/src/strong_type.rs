/// Macro to create a strongly-typed newtype wrapper around an integer.
///
/// The generated type implements:
/// - `Deref` to the inner type
/// - `From<inner>` and `Into<inner>`
/// - `FromStr` (decimal), used for ids read back from coordination nodes and
///   metadata-store keys
/// - `Display`, `Debug`, `Clone`, `Copy`
/// - `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - `Default`
/// - `serde::Serialize` and `serde::Deserialize` (transparent)
#[macro_export]
macro_rules! strong_type {
    ($name:ident, $inner:ty) => {
        #[derive(
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            Default,
            serde::Serialize,
            serde::Deserialize,
        )]
        #[serde(transparent)]
        #[repr(transparent)]
        pub struct $name(pub $inner);

        impl ::std::ops::Deref for $name {
            type Target = $inner;

            #[inline]
            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = ::std::num::ParseIntError;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                s.trim().parse::<$inner>().map(Self)
            }
        }

        impl From<$inner> for $name {
            #[inline]
            fn from(val: $inner) -> Self {
                Self(val)
            }
        }

        impl From<$name> for $inner {
            #[inline]
            fn from(val: $name) -> Self {
                val.0
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    strong_type!(SlotId, u32);

    #[test]
    fn test_deref_and_convert() {
        let id: SlotId = 100u32.into();
        assert_eq!(*id, 100);
        let raw: u32 = id.into();
        assert_eq!(raw, 100);
    }

    #[test]
    fn test_display_debug() {
        let id = SlotId(7);
        assert_eq!(format!("{}", id), "7");
        assert_eq!(format!("{:?}", id), "SlotId(7)");
    }

    #[test]
    fn test_parse_decimal() {
        assert_eq!("42".parse::<SlotId>().unwrap(), SlotId(42));
        assert_eq!(" 9 ".parse::<SlotId>().unwrap(), SlotId(9));
        assert!("x1".parse::<SlotId>().is_err());
        assert!("-1".parse::<SlotId>().is_err());
    }

    #[test]
    fn test_ordering_in_sets() {
        let set: BTreeSet<SlotId> = [SlotId(3), SlotId(1), SlotId(3)].into_iter().collect();
        assert_eq!(set.into_iter().collect::<Vec<_>>(), vec![SlotId(1), SlotId(3)]);
    }

    #[test]
    fn test_serde_transparent() {
        let json = serde_json::to_string(&SlotId(42)).unwrap();
        assert_eq!(json, "42");
        let parsed: SlotId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, SlotId(42));
    }
}
