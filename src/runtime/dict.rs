use crate::lang::addr::Addr;
use crate::lang::code::{Cell, Code, Slot, Token, Xt};
use crate::runtime::runtime_error::ErrorKind;

/// First token handed to anonymous nodes. Everything below it is a word
/// token and fits the token field of a packed address.
pub const FIRST_NODE: Token = Addr::MAX_TOKEN + 1;

/// The dictionary: every node ever created plus the ordered list of entries
/// that name lookup walks.
///
/// Named words live in `words` and anonymous nodes (literals, structural
/// nodes, placeholders) in `nodes`, each numbered by its own counter, so only
/// named words use up address space. `entries` is the symbol table; `forget`
/// truncates it, but both stores keep growing so tokens are never handed out
/// twice.
pub struct Dict {
    words: Vec<Code>,
    nodes: Vec<Code>,
    entries: Vec<Token>,
}

impl Dict {
    pub fn new() -> Self {
        Dict {
            words: Vec::new(),
            nodes: Vec::new(),
            entries: Vec::new(),
        }
    }

    /// Store an anonymous node without making it an entry (literals,
    /// structural nodes).
    pub fn alloc(&mut self, mut code: Code) -> Token {
        let token = FIRST_NODE + self.nodes.len();
        code.token = token;
        self.nodes.push(code);
        token
    }

    /// Store a node under the next word token without making it an entry.
    /// Its token can be packed into an address.
    pub fn alloc_word(&mut self, mut code: Code) -> Token {
        let token = self.words.len();
        code.token = token;
        self.words.push(code);
        token
    }

    /// Store a node and append it as the newest entry. Unnamed entries
    /// (placeholders, interpreted constructs) take anonymous tokens.
    pub fn add(&mut self, code: Code) -> Token {
        let token = if code.name.is_empty() {
            self.alloc(code)
        } else {
            self.alloc_word(code)
        };
        self.entries.push(token);
        token
    }

    pub fn get(&self, token: Token) -> Option<&Code> {
        match token.checked_sub(FIRST_NODE) {
            Some(i) => self.nodes.get(i),
            None => self.words.get(token),
        }
    }

    pub fn get_mut(&mut self, token: Token) -> Option<&mut Code> {
        match token.checked_sub(FIRST_NODE) {
            Some(i) => self.nodes.get_mut(i),
            None => self.words.get_mut(token),
        }
    }

    fn node(&self, token: Token) -> &Code {
        match token.checked_sub(FIRST_NODE) {
            Some(i) => &self.nodes[i],
            None => &self.words[token],
        }
    }

    /// Node for a token taken off the data stack.
    pub fn code(&self, cell: Cell) -> Result<&Code, ErrorKind> {
        usize::try_from(cell)
            .ok()
            .and_then(|t| self.get(t))
            .ok_or(ErrorKind::InvalidToken(cell))
    }

    /// Next word token to be assigned.
    pub fn here(&self) -> Token {
        self.words.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = &Code> + '_ {
        self.entries.iter().map(move |&t| self.node(t))
    }

    pub fn last(&self) -> Option<Token> {
        self.entries.last().copied()
    }

    pub fn drop_last(&mut self) {
        self.entries.pop();
    }

    /// Discard every entry from position `len` on.
    pub fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    /// Discard the first entry whose token is `threshold` or later, and
    /// every entry after it.
    pub fn forget(&mut self, threshold: Token) {
        // entries are in creation order; anonymous ones sort above all words
        let keep = self
            .entries
            .iter()
            .position(|&t| t >= threshold)
            .unwrap_or(self.entries.len());
        self.entries.truncate(keep);
    }

    /// Newest entry called `name`. While compiling the newest entry is
    /// skipped so a definition cannot call itself by name.
    pub fn find(&self, name: &str, compiling: bool) -> Option<Token> {
        let skip = if compiling { 1 } else { 0 };
        self.entries
            .iter()
            .rev()
            .skip(skip)
            .find(|&&t| self.node(t).name == name)
            .copied()
    }

    /// Word whose body `token` actually executes, following `is` aliases.
    pub fn owner(&self, mut token: Token) -> Token {
        while let Some(next) = self.get(token).and_then(|c| c.alias) {
            token = next;
        }
        token
    }

    pub fn body(&self, token: Token) -> &[Token] {
        self.get(self.owner(token))
            .map(|c| c.pf.as_slice())
            .unwrap_or(&[])
    }

    fn body_mut(&mut self, token: Token) -> Option<&mut Vec<Token>> {
        let owner = self.owner(token);
        self.get_mut(owner).map(|c| &mut c.pf)
    }

    /// Append `w` to the body of the newest entry.
    pub fn compile(&mut self, w: Token) {
        if let Some(last) = self.last() {
            if let Some(pf) = self.body_mut(last) {
                pf.push(w);
            }
        }
    }

    /// Make `dst` execute `src`'s body.
    pub fn alias(&mut self, dst: Token, src: Token) {
        let root = self.owner(src);
        if root == dst {
            return;
        }
        if let Some(c) = self.get_mut(dst) {
            c.alias = Some(root);
        }
    }

    /// Structural node being closed by `word`: the last node compiled into
    /// the entry below the open placeholder.
    pub fn bran(&self, word: &'static str) -> Result<Token, ErrorKind> {
        let n = self.entries.len();
        if n < 2 || self.node(self.entries[n - 1]).xt != Xt::Tmp {
            return Err(ErrorKind::NoOpenConstruct(word));
        }
        let target = self
            .body(self.entries[n - 2])
            .last()
            .copied()
            .ok_or(ErrorKind::NoOpenConstruct(word))?;
        if !self.node(target).xt.is_structural() {
            return Err(ErrorKind::NoOpenConstruct(word));
        }
        Ok(target)
    }

    /// Move everything compiled into the open placeholder onto the end of
    /// `target`'s `slot` list.
    pub fn transplant(&mut self, target: Token, slot: Slot) {
        let Some(last) = self.last() else {
            return;
        };
        let Some(open) = self.get_mut(last) else {
            return;
        };
        let moved = std::mem::take(&mut open.pf);
        if let Some(t) = self.get_mut(target) {
            t.slot_mut(slot).extend(moved);
        }
    }

    // Cell storage

    /// Append a slot to the data field of the newest entry.
    pub fn comma(&mut self, v: Cell) -> Result<(), ErrorKind> {
        let last = self.last().ok_or(ErrorKind::InvalidToken(0))?;
        let head = self.data_field(last)?;
        if let Some(c) = self.get_mut(head) {
            c.qf.push(v);
        }
        Ok(())
    }

    /// First child of a word's body, which holds its slots.
    fn data_field(&self, word: Token) -> Result<Token, ErrorKind> {
        self.body(word).first().copied().ok_or_else(|| {
            ErrorKind::NoDataField(self.get(word).map(|c| c.name.clone()).unwrap_or_default())
        })
    }

    fn cell_ref(&self, cell: Cell) -> Result<(Token, usize), ErrorKind> {
        let addr = Addr::decode(cell).ok_or(ErrorKind::InvalidAddress(cell))?;
        if self.get(addr.token()).is_none() {
            return Err(ErrorKind::InvalidAddress(cell));
        }
        let head = self
            .data_field(addr.token())
            .map_err(|_| ErrorKind::InvalidAddress(cell))?;
        if addr.offset() >= self.node(head).qf.len() {
            return Err(ErrorKind::InvalidAddress(cell));
        }
        Ok((head, addr.offset()))
    }

    pub fn get_cell(&self, cell: Cell) -> Result<Cell, ErrorKind> {
        let (head, i) = self.cell_ref(cell)?;
        Ok(self.node(head).qf[i])
    }

    pub fn set_cell(&mut self, cell: Cell, v: Cell) -> Result<(), ErrorKind> {
        let (head, i) = self.cell_ref(cell)?;
        if let Some(c) = self.get_mut(head) {
            c.qf[i] = v;
        }
        Ok(())
    }

    /// Slot 0 of a word's data field. ( used by `to` )
    pub fn set_value(&mut self, word: Token, v: Cell) -> Result<(), ErrorKind> {
        let head = self.data_field(word)?;
        if let Some(c) = self.get_mut(head) {
            match c.qf.first_mut() {
                Some(slot) => *slot = v,
                None => c.qf.push(v),
            }
        }
        Ok(())
    }

    /// Text at a non-negative string address: the node's own text, or the
    /// text of body child `offset` of a composite word.
    pub fn string_at(&self, cell: Cell) -> Option<&str> {
        let addr = Addr::decode(cell)?;
        let node = self.get(addr.token())?;
        if let Some(text) = &node.text {
            return Some(text);
        }
        let child = *self.body(addr.token()).get(addr.offset())?;
        self.get(child)?.text.as_deref()
    }
}

impl Default for Dict {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::prim::Prim;

    // ============================================================
    // Test Helpers
    // ============================================================

    /// Dictionary with a few primitives and a variable `v` holding 5.
    fn sample() -> (Dict, Token) {
        let mut d = Dict::new();
        d.add(Code::prim("dup", Prim::Dup, false));
        d.add(Code::prim("drop", Prim::Drop, false));
        let v = d.add(Code::colon("v"));
        let var = d.alloc(Code::var(Addr::new(v, 0).unwrap(), 1));
        d.compile(var);
        d.set_cell(Addr::new(v, 0).unwrap().encode(), 5).unwrap();
        (d, v)
    }

    // ============================================================
    // Lookup
    // ============================================================

    #[test]
    fn test_words_and_nodes_count_separately() {
        let mut d = Dict::new();
        assert!(d.is_empty());
        let a = d.add(Code::colon("a"));
        let lit = d.alloc(Code::lit(1));
        let b = d.add(Code::colon("b"));
        let tmp = d.add(Code::placeholder());
        assert_eq!((a, lit, b, tmp), (0, FIRST_NODE, 1, FIRST_NODE + 1));
        assert_eq!(d.here(), 2);
        assert_eq!(d.len(), 3);
        assert!(!d.is_empty());
        assert_eq!(d.get(lit).unwrap().qf, vec![1]);
    }

    #[test]
    fn test_anonymous_nodes_leave_word_tokens_addressable() {
        let mut d = Dict::new();
        for n in 0..(Addr::MAX_TOKEN as Cell + 10) {
            d.alloc(Code::lit(n));
        }
        let v = d.add(Code::colon("v"));
        assert_eq!(v, 0);
        assert!(Addr::new(v, 0).is_ok());
    }

    #[test]
    fn test_forget_drops_open_placeholder() {
        let mut d = Dict::new();
        let keep = d.add(Code::colon("keep"));
        let w = d.add(Code::colon("w"));
        d.add(Code::placeholder());
        d.forget(w);
        assert_eq!(d.len(), 1);
        assert_eq!(d.last(), Some(keep));
    }

    #[test]
    fn test_find_newest_wins() {
        let mut d = Dict::new();
        let old = d.add(Code::colon("x"));
        let new = d.add(Code::colon("x"));
        assert_ne!(old, new);
        assert_eq!(d.find("x", false), Some(new));
        assert_eq!(d.get(old).unwrap().name, "x");
    }

    #[test]
    fn test_find_skips_word_being_defined() {
        let mut d = Dict::new();
        let old = d.add(Code::colon("x"));
        d.add(Code::colon("x"));
        assert_eq!(d.find("x", true), Some(old));
    }

    #[test]
    fn test_find_missing() {
        let (d, _) = sample();
        assert_eq!(d.find("nope", false), None);
    }

    #[test]
    fn test_forget_truncates_suffix() {
        let mut d = Dict::new();
        let keep = d.add(Code::colon("keep"));
        let a = d.add(Code::colon("a"));
        d.add(Code::colon("b"));
        d.forget(a);
        assert_eq!(d.find("keep", false), Some(keep));
        assert_eq!(d.find("a", false), None);
        assert_eq!(d.find("b", false), None);
        // tokens keep counting after a forget
        assert_eq!(d.add(Code::colon("c")), 3);
    }

    // ============================================================
    // Cells
    // ============================================================

    #[test]
    fn test_get_set_cell() {
        let (mut d, v) = sample();
        let addr = Addr::new(v, 0).unwrap().encode();
        assert_eq!(d.get_cell(addr).unwrap(), 5);
        d.set_cell(addr, -3).unwrap();
        assert_eq!(d.get_cell(addr).unwrap(), -3);
    }

    #[test]
    fn test_comma_extends_data_field() {
        let (mut d, v) = sample();
        d.comma(7).unwrap();
        d.comma(8).unwrap();
        let second = Addr::new(v, 2).unwrap().encode();
        assert_eq!(d.get_cell(second).unwrap(), 8);
    }

    #[test]
    fn test_invalid_cells() {
        let (d, v) = sample();
        assert!(matches!(d.get_cell(-1), Err(ErrorKind::InvalidAddress(-1))));
        let past = Addr::new(v, 1).unwrap().encode();
        assert!(matches!(d.get_cell(past), Err(ErrorKind::InvalidAddress(_))));
        let prim = d.find("dup", false).unwrap() as Cell;
        assert!(d.get_cell(prim).is_err());
        assert!(d.get_cell(4000).is_err());
    }

    // ============================================================
    // Bodies
    // ============================================================

    #[test]
    fn test_alias_shares_body() {
        let mut d = Dict::new();
        let lit = d.alloc(Code::lit(1));
        let a = d.add(Code::colon("a"));
        d.compile(lit);
        let b = d.add(Code::colon("b"));
        d.alias(b, a);
        assert_eq!(d.body(b), &[lit]);
        // later additions to a are seen through b
        let lit2 = d.alloc(Code::lit(2));
        d.get_mut(a).unwrap().pf.push(lit2);
        assert_eq!(d.body(b), &[lit, lit2]);
    }

    #[test]
    fn test_alias_never_cycles() {
        let mut d = Dict::new();
        let a = d.add(Code::colon("a"));
        let b = d.add(Code::colon("b"));
        d.alias(b, a);
        d.alias(a, b);
        d.alias(a, a);
        assert_eq!(d.owner(a), a);
        assert_eq!(d.owner(b), a);
    }

    #[test]
    fn test_bran_and_transplant() {
        let mut d = Dict::new();
        d.add(Code::colon("w"));
        let branch = d.alloc(Code::new("if", Xt::Branch));
        d.compile(branch);
        d.add(Code::placeholder());
        let lit = d.alloc(Code::lit(9));
        d.compile(lit);

        assert_eq!(d.bran("then").unwrap(), branch);
        d.transplant(branch, Slot::P1);
        assert_eq!(d.get(branch).unwrap().p1, vec![lit]);
        assert!(d.body(d.last().unwrap()).is_empty());
    }

    #[test]
    fn test_bran_without_placeholder() {
        let (d, _) = sample();
        assert!(matches!(
            d.bran("then"),
            Err(ErrorKind::NoOpenConstruct("then"))
        ));
    }

    #[test]
    fn test_string_at() {
        let mut d = Dict::new();
        let w = d.add(Code::colon("w"));
        let s = d.alloc_word(Code::string("s\"", Xt::Str, "hello".to_string()));
        d.compile(s);
        assert_eq!(d.string_at(s as Cell), Some("hello"));
        assert_eq!(d.string_at(Addr::new(w, 0).unwrap().encode()), Some("hello"));
        assert_eq!(d.string_at(Addr::new(w, 1).unwrap().encode()), None);
    }
}
