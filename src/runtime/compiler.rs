//! Compile-time words: control structures, defining words and the small
//! helpers that read a name off the input line.
//!
//! Control structures are built with a placeholder entry. The opening word
//! compiles a structural node into the current definition and pushes an
//! unnamed `Tmp` entry; everything compiled afterwards lands in the
//! placeholder, and each later word of the construct moves that code into
//! one of the structural node's child lists.

use crate::lang::addr::Addr;
use crate::lang::code::{Code, Slot, Token, Xt};
use crate::runtime::runtime_error::RuntimeError;
use crate::runtime::vm::Vm;

impl Vm {
    /// Read the name for a new word. Warns when it shadows an existing one.
    pub(crate) fn word(&mut self) -> Option<Code> {
        let name = self.io.next_token()?;
        if self.dict.find(&name, self.compile).is_some() {
            self.io.pstr(&format!("{} reDef? ", name));
        }
        Some(Code::colon(&name))
    }

    /// Look up the next word on the input line.
    pub(crate) fn tick(&mut self) -> Option<Token> {
        let name = self.io.next_token()?;
        let found = self.dict.find(&name, self.compile);
        if found.is_none() {
            self.io.pstr(&format!("{}? ", name));
        }
        found
    }

    // Definitions

    pub(crate) fn colon(&mut self) {
        let len = self.dict.len();
        if let Some(w) = self.word() {
            self.dict.add(w);
            self.open_def = Some(len);
            self.transient = false;
        }
        self.compile = true;
    }

    pub(crate) fn semicolon(&mut self) {
        self.compile = false;
        self.open_def = None;
        self.transient = false;
    }

    /// `create` (no cells) and `variable` (one zeroed cell).
    pub(crate) fn variable(&mut self, slots: usize) -> Result<(), RuntimeError> {
        let Some(w) = self.word() else {
            return Ok(());
        };
        let addr = Addr::new(self.dict.here(), 0)?;
        self.dict.add(w);
        let cell = self.dict.alloc(Code::var(addr, slots));
        self.dict.compile(cell);
        Ok(())
    }

    pub(crate) fn constant(&mut self) -> Result<(), RuntimeError> {
        let v = self.pop()?;
        let Some(w) = self.word() else {
            return Ok(());
        };
        self.dict.add(w);
        let lit = self.dict.alloc(Code::lit(v));
        self.dict.compile(lit);
        Ok(())
    }

    /// Compile-time half of `does>`.
    pub(crate) fn does_compile(&mut self) {
        let Some(def) = self.dict.last() else {
            return;
        };
        let w = self.dict.alloc(Code::new("does>", Xt::Does(def)));
        self.dict.compile(w);
    }

    pub(crate) fn to(&mut self) -> Result<(), RuntimeError> {
        if let Some(w) = self.tick() {
            let v = self.pop()?;
            self.dict.set_value(w, v)?;
        }
        Ok(())
    }

    /// `' src is dst`: make dst run src's body.
    pub(crate) fn is(&mut self) -> Result<(), RuntimeError> {
        if let Some(dst) = self.tick() {
            let cell = self.pop()?;
            let src = self.dict.code(cell)?.token;
            self.dict.alias(dst, src);
        }
        Ok(())
    }

    pub(crate) fn postpone(&mut self) {
        if let Some(w) = self.tick() {
            self.dict.compile(w);
        }
    }

    pub(crate) fn immediate(&mut self) {
        if let Some(w) = self.dict.last().and_then(|t| self.dict.get_mut(t)) {
            w.immediate = true;
        }
    }

    // Strings

    /// `s"`: the string is pushed (interpreting) or compiled as a literal.
    pub(crate) fn s_quote(&mut self) -> Result<(), RuntimeError> {
        let text = self.io.scan('"').unwrap_or_default();
        if self.compile {
            // pushes its own address at run time
            let s = self.dict.alloc_word(Code::string("s\"", Xt::Str, text));
            self.dict.compile(s);
        } else {
            self.push(Addr::PAD)?;
            self.push(text.chars().count() as i32)?;
        }
        Ok(())
    }

    pub(crate) fn dot_quote(&mut self) {
        let text = self.io.scan('"').unwrap_or_default();
        if self.compile {
            let s = self.dict.alloc(Code::string(".\"", Xt::DotStr, text));
            self.dict.compile(s);
        } else {
            self.io.pstr(&text);
        }
    }

    // Control structures

    /// Compile a structural node and open a placeholder for its body. Typed
    /// outside a definition, the construct is collected in an anonymous word
    /// that runs once the construct is closed.
    fn open(&mut self, name: &str, xt: Xt) {
        if !self.compile {
            self.open_def = Some(self.dict.len());
            self.transient = true;
            self.compile = true;
            self.dict.add(Code::colon(""));
        }
        let node = self.dict.alloc(Code::new(name, xt));
        self.dict.compile(node);
        self.dict.add(Code::placeholder());
    }

    /// Drop the placeholder. If that closes the last construct of an
    /// interpreted line, run the anonymous word.
    fn close(&mut self) -> Result<(), RuntimeError> {
        self.dict.drop_last();
        if !self.transient || self.dict.len() != self.open_def.map_or(0, |n| n + 1) {
            return Ok(());
        }
        let Some(w) = self.dict.last() else {
            return Ok(());
        };
        self.abandon();
        self.nest(w)?;
        Ok(())
    }

    fn set_stage(&mut self, t: Token, stage: u8) {
        if let Some(c) = self.dict.get_mut(t) {
            c.stage = stage;
        }
    }

    fn stage_of(&self, t: Token) -> u8 {
        self.dict.get(t).map_or(0, |c| c.stage)
    }

    pub(crate) fn if_(&mut self) {
        self.open("if", Xt::Branch);
    }

    pub(crate) fn else_(&mut self) -> Result<(), RuntimeError> {
        let b = self.dict.bran("else")?;
        self.dict.transplant(b, Slot::Pf);
        self.set_stage(b, 1);
        Ok(())
    }

    /// Closes `if` and `if .. else`; inside `for .. aft` it ends the section
    /// run between passes.
    pub(crate) fn then(&mut self) -> Result<(), RuntimeError> {
        let b = self.dict.bran("then")?;
        match self.stage_of(b) {
            0 => {
                self.dict.transplant(b, Slot::Pf);
                self.close()
            }
            1 => {
                self.dict.transplant(b, Slot::P1);
                self.close()
            }
            _ => {
                self.dict.transplant(b, Slot::P1);
                Ok(())
            }
        }
    }

    pub(crate) fn begin(&mut self) {
        self.open("begin", Xt::Begin);
    }

    pub(crate) fn while_(&mut self) -> Result<(), RuntimeError> {
        let b = self.dict.bran("while")?;
        self.dict.transplant(b, Slot::Pf);
        self.set_stage(b, 2);
        Ok(())
    }

    pub(crate) fn repeat(&mut self) -> Result<(), RuntimeError> {
        let b = self.dict.bran("repeat")?;
        self.dict.transplant(b, Slot::P1);
        self.close()
    }

    pub(crate) fn again(&mut self) -> Result<(), RuntimeError> {
        let b = self.dict.bran("again")?;
        self.dict.transplant(b, Slot::Pf);
        self.set_stage(b, 1);
        self.close()
    }

    pub(crate) fn until(&mut self) -> Result<(), RuntimeError> {
        let b = self.dict.bran("until")?;
        self.dict.transplant(b, Slot::Pf);
        self.close()
    }

    pub(crate) fn for_(&mut self) {
        self.prologue(Xt::ToR);
        self.open("for", Xt::For);
    }

    pub(crate) fn aft(&mut self) -> Result<(), RuntimeError> {
        let b = self.dict.bran("aft")?;
        self.dict.transplant(b, Slot::Pf);
        self.set_stage(b, 3);
        Ok(())
    }

    pub(crate) fn next(&mut self) -> Result<(), RuntimeError> {
        let b = self.dict.bran("next")?;
        let slot = if self.stage_of(b) == 0 { Slot::Pf } else { Slot::P2 };
        self.dict.transplant(b, slot);
        self.close()
    }

    pub(crate) fn do_(&mut self) {
        self.prologue(Xt::ToR2);
        self.open("do", Xt::Loop);
    }

    pub(crate) fn loop_(&mut self) -> Result<(), RuntimeError> {
        let b = self.dict.bran("loop")?;
        self.dict.transplant(b, Slot::Pf);
        self.close()
    }

    /// Loop set-up node compiled ahead of `for` / `do`. Outside a definition
    /// it runs inside the anonymous word, so it goes there.
    fn prologue(&mut self, xt: Xt) {
        if !self.compile {
            self.open_def = Some(self.dict.len());
            self.transient = true;
            self.compile = true;
            self.dict.add(Code::colon(""));
        }
        let node = self.dict.alloc(Code::new("\t", xt));
        self.dict.compile(node);
    }
}
