use super::code::{Cell, Token};
use crate::runtime::runtime_error::ErrorKind;

/// Packed cell address: `(offset << 16) | token`.
///
/// The word token selects a dictionary node, the offset selects one of its
/// variable slots (or, for composite words holding strings, a body child).
/// Negative cells are not addresses; they refer to the pad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Addr {
    token: Token,
    offset: usize,
}

impl Addr {
    const TOKEN_BITS: u32 = 16;
    const TOKEN_MASK: Cell = 0xffff;

    pub const MAX_TOKEN: Token = 0xffff;
    pub const MAX_OFFSET: usize = 0x7fff;

    /// Address of the pad (the last scanned string).
    pub const PAD: Cell = -1;

    /// Slot 0 of the reserved word at token 0: the numeric base.
    pub const BASE: Addr = Addr {
        token: 0,
        offset: 0,
    };

    pub fn new(token: Token, offset: usize) -> Result<Self, ErrorKind> {
        if token > Self::MAX_TOKEN || offset > Self::MAX_OFFSET {
            return Err(ErrorKind::AddressOverflow { token, offset });
        }
        Ok(Addr { token, offset })
    }

    /// Decode a cell; `None` for the negative pad sentinel.
    pub fn decode(cell: Cell) -> Option<Self> {
        if cell < 0 {
            return None;
        }
        Some(Addr {
            token: (cell & Self::TOKEN_MASK) as Token,
            offset: (cell >> Self::TOKEN_BITS) as usize,
        })
    }

    pub fn encode(self) -> Cell {
        ((self.offset as Cell) << Self::TOKEN_BITS) | self.token as Cell
    }

    pub fn token(self) -> Token {
        self.token
    }

    pub fn offset(self) -> usize {
        self.offset
    }

    /// Same word, `by` cells further on. ( used by `th` )
    pub fn index(self, by: Cell) -> Result<Self, ErrorKind> {
        let offset = self.offset as i64 + by as i64;
        if offset < 0 {
            return Err(ErrorKind::InvalidIndex(by));
        }
        Addr::new(self.token, offset as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_base_cell_is_zero() {
        assert_eq!(Addr::BASE.encode(), 0);
        assert_eq!(Addr::decode(0), Some(Addr::BASE));
    }

    #[test]
    fn test_layout() {
        let a = Addr::new(0x12, 3).unwrap();
        assert_eq!(a.encode(), 0x0003_0012);
    }

    #[test]
    fn test_negative_is_pad() {
        assert_eq!(Addr::decode(Addr::PAD), None);
        assert_eq!(Addr::decode(i32::MIN), None);
    }

    #[test]
    fn test_full_sixteen_bit_token() {
        let a = Addr::new(0x8001, 1).unwrap();
        assert_eq!(Addr::decode(a.encode()), Some(a));
    }

    #[test]
    fn test_overflow_rejected() {
        assert!(matches!(
            Addr::new(0x1_0000, 0),
            Err(ErrorKind::AddressOverflow { .. })
        ));
        assert!(matches!(
            Addr::new(1, 0x8000),
            Err(ErrorKind::AddressOverflow { .. })
        ));
    }

    #[test]
    fn test_index() {
        let a = Addr::new(9, 0).unwrap();
        assert_eq!(a.index(2).unwrap(), Addr::new(9, 2).unwrap());
        assert!(matches!(a.index(-1), Err(ErrorKind::InvalidIndex(-1))));
    }

    // ============================================================
    // Property tests
    // ============================================================

    proptest! {
        /// decode(encode(t, k)) == (t, k) for every valid pair.
        #[test]
        fn prop_round_trip(token in 0usize..=Addr::MAX_TOKEN, offset in 0usize..=Addr::MAX_OFFSET) {
            let a = Addr::new(token, offset).unwrap();
            let cell = a.encode();
            prop_assert!(cell >= 0);
            let back = Addr::decode(cell).unwrap();
            prop_assert_eq!(back.token(), token);
            prop_assert_eq!(back.offset(), offset);
        }

        /// Every non-negative cell decodes and re-encodes to itself.
        #[test]
        fn prop_decode_encode(cell in 0..=i32::MAX) {
            let a = Addr::decode(cell).unwrap();
            prop_assert_eq!(a.encode(), cell);
        }
    }
}
