use super::addr::Addr;
use super::prim::Prim;

/// Dictionary-assigned node identity.
pub type Token = usize;

/// Data unit held on the stacks and in variable slots.
pub type Cell = i32;

/// What executing a node does.
///
/// `Prim` nodes run natively, `Colon` nodes walk their body, and the rest are
/// compiler-generated nodes that never appear in the dictionary by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Xt {
    // ───────────────────────────── Words ────────────────────────────────
    /// Native primitive.
    Prim(Prim),

    /// Composite word: execute each child of `pf` in order.
    Colon,

    // ───────────────────────────── Literals ─────────────────────────────
    /// Push slot 0.
    ///
    /// Stack effect: `( -- n )`
    Lit,

    /// Push the packed address of a variable or `create`d word.
    ///
    /// Stack effect: `( -- addr )`
    Var(Addr),

    /// Push the address and length of the node's own text.
    ///
    /// Stack effect: `( -- addr len )`
    Str,

    /// Print the node's own text.
    DotStr,

    /// Run-time half of `does>`; carries the defining word's token.
    Does(Token),

    // ─────────────────────────── Loop set-up ────────────────────────────
    /// Move the loop count to the return stack before a `for`.
    ///
    /// Stack effect: `( n -- )`
    ToR,

    /// Move limit and start index to the return stack before a `do`.
    ///
    /// Stack effect: `( limit first -- )`
    ToR2,

    // ──────────────────────────── Structural ────────────────────────────
    /// `if .. else .. then`
    Branch,

    /// `begin .. until`, `begin .. again`, `begin .. while .. repeat`
    Begin,

    /// `for .. next`, `for .. aft .. then .. next`
    For,

    /// `do .. loop`
    Loop,

    /// Open placeholder collecting a construct's body while it is compiled.
    Tmp,
}

impl Xt {
    /// Structural nodes own branch bodies that `see` should print inline.
    pub fn is_structural(self) -> bool {
        matches!(self, Xt::Branch | Xt::Begin | Xt::For | Xt::Loop)
    }
}

/// Selects one of a node's three child lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Pf,
    P1,
    P2,
}

/// A dictionary node.
#[derive(Debug, Clone)]
pub struct Code {
    /// Lookup name; empty for placeholders.
    pub name: String,
    pub immediate: bool,
    /// Assigned by the dictionary on allocation.
    pub token: Token,
    /// Which variant of a control construct this node represents.
    pub stage: u8,
    pub xt: Xt,
    pub pf: Vec<Token>,
    pub p1: Vec<Token>,
    pub p2: Vec<Token>,
    /// Variable / constant / literal storage.
    pub qf: Vec<Cell>,
    pub text: Option<String>,
    /// Set by `is`: this word executes the body owned by another word.
    pub alias: Option<Token>,
}

impl Code {
    pub fn new(name: &str, xt: Xt) -> Self {
        Code {
            name: name.to_string(),
            immediate: false,
            token: 0,
            stage: 0,
            xt,
            pf: Vec::new(),
            p1: Vec::new(),
            p2: Vec::new(),
            qf: Vec::new(),
            text: None,
            alias: None,
        }
    }

    /// Built-in word.
    pub fn prim(name: &str, prim: Prim, immediate: bool) -> Self {
        Code {
            immediate,
            ..Code::new(name, Xt::Prim(prim))
        }
    }

    /// Empty composite word, as created by `:`, `variable`, `create`.
    pub fn colon(name: &str) -> Self {
        Code::new(name, Xt::Colon)
    }

    /// Literal holding a single value.
    pub fn lit(value: Cell) -> Self {
        Code {
            qf: vec![value],
            ..Code::new("lit", Xt::Lit)
        }
    }

    /// Variable cell pushing `addr`, with `slots` zeroed cells.
    pub fn var(addr: Addr, slots: usize) -> Self {
        Code {
            qf: vec![0; slots],
            ..Code::new("var", Xt::Var(addr))
        }
    }

    /// String literal; `xt` is `Xt::Str` for `s"` and `Xt::DotStr` for `."`.
    pub fn string(name: &str, xt: Xt, text: String) -> Self {
        Code {
            text: Some(text),
            ..Code::new(name, xt)
        }
    }

    /// Anonymous placeholder opened by `if`, `begin`, `for`, `do`.
    pub fn placeholder() -> Self {
        Code::new("", Xt::Tmp)
    }

    pub fn slot(&self, slot: Slot) -> &Vec<Token> {
        match slot {
            Slot::Pf => &self.pf,
            Slot::P1 => &self.p1,
            Slot::P2 => &self.p2,
        }
    }

    pub fn slot_mut(&mut self, slot: Slot) -> &mut Vec<Token> {
        match slot {
            Slot::Pf => &mut self.pf,
            Slot::P1 => &mut self.p1,
            Slot::P2 => &mut self.p2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lit_holds_one_slot() {
        let c = Code::lit(42);
        assert_eq!(c.xt, Xt::Lit);
        assert_eq!(c.qf, vec![42]);
        assert!(!c.immediate);
    }

    #[test]
    fn test_var_slots_are_zeroed() {
        let addr = Addr::new(7, 0).unwrap();
        assert_eq!(Code::var(addr, 1).qf, vec![0]);
        assert!(Code::var(addr, 0).qf.is_empty());
    }

    #[test]
    fn test_slot_selects_list() {
        let mut c = Code::new("if", Xt::Branch);
        c.slot_mut(Slot::P1).push(3);
        c.slot_mut(Slot::P2).push(4);
        assert!(c.slot(Slot::Pf).is_empty());
        assert_eq!(c.slot(Slot::P1), &vec![3]);
        assert_eq!(c.slot(Slot::P2), &vec![4]);
    }

    #[test]
    fn test_structural_kinds() {
        assert!(Xt::Branch.is_structural());
        assert!(Xt::Loop.is_structural());
        assert!(!Xt::Colon.is_structural());
        assert!(!Xt::Tmp.is_structural());
    }
}
