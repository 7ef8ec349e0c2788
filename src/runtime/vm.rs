use crate::frontend::io::{Io, ReaderSource, Source, atoi, itoa};
use crate::lang::addr::Addr;
use crate::lang::code::{Cell, Code, Slot, Token, Xt};
use crate::lang::prim::{PRIMITIVES, Prim};
use crate::runtime::config::VmConfig;
use crate::runtime::dict::Dict;
use crate::runtime::runtime_error::{ErrorKind, RuntimeError};
use std::fs::File;
use std::io::BufReader;

pub const APP_NAME: &str = "eForth v4.2";

/// How a node finished running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Completed,
    /// `exit`, `leave` or a `does>` runtime cut the enclosing body short.
    EarlyExit,
}

pub struct Vm {
    pub(crate) dict: Dict,
    pub(crate) io: Io,
    pub(crate) ss: Vec<Cell>,
    pub(crate) rs: Vec<Cell>,
    pub(crate) base: Cell,
    pub(crate) compile: bool,
    pub(crate) run: bool,
    // Safety limits
    config: VmConfig,
    call_depth: usize,
    steps: usize,
    /// Token of the `boot` primitive; nothing at or below it can be forgotten.
    pub(crate) fence: Token,
    /// Entry count before the definition being compiled, if any.
    pub(crate) open_def: Option<usize>,
    /// The open definition is an anonymous word wrapping a control
    /// structure typed in interpret mode.
    pub(crate) transient: bool,
}

impl Vm {
    pub fn new() -> Self {
        Self::with_config(VmConfig::default())
    }

    pub fn with_config(config: VmConfig) -> Self {
        Self::with_io(Io::stdio(APP_NAME), config)
    }

    pub fn with_io(mut io: Io, config: VmConfig) -> Self {
        io.set_trace(config.trace);
        if let Some(seed) = config.seed {
            io.seed(seed);
        }
        let mut vm = Vm {
            dict: Dict::new(),
            io,
            ss: Vec::new(),
            rs: Vec::new(),
            base: 10,
            compile: false,
            run: true,
            config,
            call_depth: 0,
            steps: 0,
            fence: 0,
            open_def: None,
            transient: false,
        };
        vm.boot();
        vm
    }

    /// Populate the dictionary: the `base` cell at token 0, then every
    /// primitive in table order.
    fn boot(&mut self) {
        let base = self.dict.add(Code::colon("base"));
        let mut cell = Code::var(Addr::BASE, 1);
        cell.qf[0] = self.base;
        let cell = self.dict.alloc(cell);
        if let Some(w) = self.dict.get_mut(base) {
            w.pf.push(cell);
        }
        for &(name, prim, immediate) in PRIMITIVES {
            let t = self.dict.add(Code::prim(name, prim, immediate));
            if prim == Prim::Boot {
                self.fence = t;
            }
        }
    }

    // Accessors

    pub fn stack(&self) -> &[Cell] {
        &self.ss
    }

    pub fn rstack(&self) -> &[Cell] {
        &self.rs
    }

    pub fn dict(&self) -> &Dict {
        &self.dict
    }

    pub fn base(&self) -> Cell {
        self.base
    }

    pub fn is_compiling(&self) -> bool {
        self.compile
    }

    /// False once `bye` has run.
    pub fn is_running(&self) -> bool {
        self.run
    }

    /// Attach the primary input, typically piped stdin.
    pub fn set_input(&mut self, source: Box<dyn Source>) {
        self.io.set_input(source);
    }

    // Outer interpreter

    /// Interpret the rest of the current input line. Returns the run flag.
    pub fn outer(&mut self) -> bool {
        while self.run {
            let Some(idiom) = self.io.next_token() else {
                break;
            };
            self.parse(&idiom);
        }
        self.ok(false);
        self.run
    }

    /// Interpret one line of source.
    pub fn eval(&mut self, line: &str) -> bool {
        self.io.feed(line);
        self.outer()
    }

    /// Interpret every line of the primary input, then say goodbye.
    pub fn run(&mut self) {
        self.ok(true);
        while self.io.read_line() {
            if !self.outer() {
                break;
            }
        }
        self.io.pstr(&format!("\n{} Done.\n", APP_NAME));
    }

    fn parse(&mut self, idiom: &str) {
        self.io.debug(&format!("[DEBUG] find {}", idiom));

        if let Some(t) = self.dict.find(idiom, self.compile) {
            let (name, immediate) = self
                .dict
                .get(t)
                .map(|c| (c.name.clone(), c.immediate))
                .unwrap_or_default();
            self.io.debug(&format!(" => [{}] {}\n", t, name));

            if !self.compile || immediate {
                self.steps = 0;
                if let Err(e) = self.nest(t) {
                    self.io.err(&e);
                }
            } else {
                self.dict.compile(t);
            }
            return;
        }

        let n = atoi(idiom, self.base);
        match n {
            Some(n) => self.io.debug(&format!(" => {}\n", n)),
            None => self.io.debug(" => not found\n"),
        }
        match n {
            Some(n) if self.compile => {
                let lit = self.dict.alloc(Code::lit(n));
                self.dict.compile(lit);
            }
            Some(n) => {
                if let Err(e) = self.push(n) {
                    self.io.err(&e);
                }
            }
            None => {
                self.io.pstr(&format!("{} ? ", idiom));
                self.abandon();
            }
        }
    }

    /// Drop a half-built definition and fall back to interpreting.
    pub(crate) fn abandon(&mut self) {
        if !self.compile {
            return;
        }
        if let Some(len) = self.open_def.take() {
            self.dict.truncate(len);
        }
        self.transient = false;
        self.compile = false;
    }

    /// Print the prompt, preceded by the banner when `stat` is set.
    pub fn ok(&mut self, stat: bool) {
        if stat {
            self.banner();
        }
        if self.io.load_depth() > 0 || !self.config.prompt {
            return;
        }
        let prompt = self.prompt();
        self.io.pstr(&prompt);
    }

    /// `> ` while compiling, otherwise the stack followed by `ok`.
    pub fn prompt(&self) -> String {
        if self.compile {
            return "> ".to_string();
        }
        let stack: String = self
            .ss
            .iter()
            .map(|&n| format!("{} ", itoa(n, self.base)))
            .collect();
        format!("< {}>ok ", stack)
    }

    pub(crate) fn banner(&mut self) {
        let text = format!(
            "\n{}, {} words, {} tokens\n",
            self.io.name(),
            self.dict.len(),
            self.dict.here()
        );
        self.io.pstr(&text);
    }

    /// Interpret a source file line by line, then resume the current line.
    /// Returns the number of lines read.
    pub fn load(&mut self, path: &str) -> usize {
        if self.io.load_depth() >= self.config.max_load_depth {
            let kind = ErrorKind::LoadDepthExceeded(self.config.max_load_depth);
            self.io.err(&RuntimeError::new(kind).with_context(path));
            return 0;
        }
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                self.io.err(&RuntimeError::from(e).with_context(path));
                return 0;
            }
        };
        let tib = self.io.take_tib();
        self.io
            .push_source(Box::new(ReaderSource::new(BufReader::new(file))));

        let mut lines = 0;
        while self.io.read_line() {
            lines += 1;
            if !self.outer() {
                break;
            }
        }

        self.io.pop_source();
        self.io.restore_tib(tib);
        lines
    }

    // Inner interpreter

    fn check_limits(&mut self) -> Result<(), RuntimeError> {
        self.steps += 1;

        if let Some(max) = self.config.max_steps {
            if self.steps > max {
                return Err(ErrorKind::StepLimitExceeded(max).into());
            }
        }
        Ok(())
    }

    /// Execute the node `t`.
    pub fn nest(&mut self, t: Token) -> Result<Flow, RuntimeError> {
        self.call_depth += 1;

        if self.call_depth > self.config.max_call_depth {
            self.call_depth -= 1;
            return Err(ErrorKind::CallDepthExceeded(self.config.max_call_depth).into());
        }

        let result = self.nest_inner(t);

        self.call_depth -= 1;
        result
    }

    // Only dispatch lives here; leaf work goes through `leaf` so the frames
    // repeated per nesting level stay small.
    fn nest_inner(&mut self, t: Token) -> Result<Flow, RuntimeError> {
        self.check_limits()?;

        let xt = self
            .dict
            .get(t)
            .map(|c| c.xt)
            .ok_or(ErrorKind::InvalidToken(t as Cell))?;

        match xt {
            Xt::Prim(Prim::Exec) => self.exec(),
            Xt::Prim(p) => self.prim(p),
            Xt::Colon => self.colon_body(t),
            Xt::Does(def) => Ok(self.does(t, def)),
            Xt::Branch => self.branch(t),
            Xt::Begin => self.dobegin(t),
            Xt::For => self.dofor(t),
            Xt::Loop => self.doloop(t),
            _ => {
                self.leaf(t, xt)?;
                Ok(Flow::Completed)
            }
        }
    }

    fn colon_body(&mut self, t: Token) -> Result<Flow, RuntimeError> {
        let body = self.dict.body(t).to_vec();
        for w in body {
            match self.nest(w) {
                Ok(Flow::Completed) => {}
                Ok(Flow::EarlyExit) => break,
                Err(e) => return Err(self.unwind(e, t)),
            }
        }
        Ok(Flow::Completed)
    }

    /// `exec`: run the word whose token is on the stack.
    pub(crate) fn exec(&mut self) -> Result<Flow, RuntimeError> {
        let cell = self.pop()?;
        let w = self.dict.code(cell)?.token;
        self.nest(w)
    }

    /// Nodes that never run other nodes.
    fn leaf(&mut self, t: Token, xt: Xt) -> Result<(), RuntimeError> {
        match xt {
            Xt::Lit => {
                let v = self
                    .dict
                    .get(t)
                    .and_then(|c| c.qf.first().copied())
                    .ok_or_else(|| ErrorKind::NoDataField("lit".to_string()))?;
                self.push(v)?;
            }
            Xt::Var(addr) => self.push(addr.encode())?,
            Xt::Str => {
                let len = self
                    .dict
                    .get(t)
                    .and_then(|c| c.text.as_ref())
                    .map_or(0, |s| s.chars().count());
                self.push(Addr::new(t, 0)?.encode())?;
                self.push(len as Cell)?;
            }
            Xt::DotStr => {
                let text = self
                    .dict
                    .get(t)
                    .and_then(|c| c.text.clone())
                    .unwrap_or_default();
                self.io.pstr(&text);
            }
            Xt::ToR => {
                let n = self.pop()?;
                self.rpush(n)?;
            }
            Xt::ToR2 => {
                let first = self.pop()?;
                let limit = self.pop()?;
                self.rpush(first)?;
                self.rpush(limit)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Add the named word `t` to the error's call stack.
    fn unwind(&self, e: RuntimeError, t: Token) -> RuntimeError {
        match self.dict.get(t) {
            Some(c) if !c.name.is_empty() => e.with_context(&c.name),
            _ => e,
        }
    }

    fn children(&self, t: Token, slot: Slot) -> Vec<Token> {
        self.dict
            .get(t)
            .map(|c| c.slot(slot).to_vec())
            .unwrap_or_default()
    }

    fn stage(&self, t: Token) -> u8 {
        self.dict.get(t).map_or(0, |c| c.stage)
    }

    fn walk(&mut self, list: &[Token]) -> Result<Flow, RuntimeError> {
        for &w in list {
            if self.nest(w)? == Flow::EarlyExit {
                return Ok(Flow::EarlyExit);
            }
        }
        Ok(Flow::Completed)
    }

    // Structural nodes

    /// `if`: run `pf` on a true flag, `p1` otherwise.
    fn branch(&mut self, t: Token) -> Result<Flow, RuntimeError> {
        let flag = self.pop()?;
        let list = self.children(t, if flag != 0 { Slot::Pf } else { Slot::P1 });
        self.walk(&list)
    }

    /// `begin`. Stage 0 is `until`, 1 is `again`, 2 is `while .. repeat`.
    fn dobegin(&mut self, t: Token) -> Result<Flow, RuntimeError> {
        let stage = self.stage(t);
        let pf = self.children(t, Slot::Pf);
        let p1 = self.children(t, Slot::P1);
        loop {
            self.check_limits()?;
            if self.walk(&pf)? == Flow::EarlyExit {
                return Ok(Flow::EarlyExit);
            }
            match stage {
                0 => {
                    if self.pop()? != 0 {
                        break;
                    }
                }
                1 => continue,
                _ => {
                    if self.pop()? == 0 {
                        break;
                    }
                }
            }
            if self.walk(&p1)? == Flow::EarlyExit {
                return Ok(Flow::EarlyExit);
            }
        }
        Ok(Flow::Completed)
    }

    /// `for`: count the return-stack top down to zero. The index is popped
    /// on the way out whatever happened inside.
    fn dofor(&mut self, t: Token) -> Result<Flow, RuntimeError> {
        let stage = self.stage(t);
        let pf = self.children(t, Slot::Pf);
        let p1 = self.children(t, Slot::P1);
        let p2 = self.children(t, Slot::P2);

        let result = self.for_body(stage, &pf, &p1, &p2);
        let popped = self.rpop();
        result?;
        popped?;
        Ok(Flow::Completed)
    }

    fn for_body(
        &mut self,
        stage: u8,
        pf: &[Token],
        p1: &[Token],
        p2: &[Token],
    ) -> Result<Flow, RuntimeError> {
        if stage == 0 {
            while self.rdec()? >= 0 {
                self.check_limits()?;
                if self.walk(pf)? == Flow::EarlyExit {
                    return Ok(Flow::EarlyExit);
                }
            }
            return Ok(Flow::Completed);
        }

        // for A aft B then C next: A once, then C, B, C, ..., C
        if self.rdec()? < 0 {
            return Ok(Flow::Completed);
        }
        if self.walk(pf)? == Flow::EarlyExit {
            return Ok(Flow::EarlyExit);
        }
        loop {
            self.check_limits()?;
            if self.walk(p2)? == Flow::EarlyExit {
                return Ok(Flow::EarlyExit);
            }
            if self.rdec()? < 0 {
                return Ok(Flow::Completed);
            }
            if self.walk(p1)? == Flow::EarlyExit {
                return Ok(Flow::EarlyExit);
            }
        }
    }

    /// `do .. loop`: the limit comes off the return stack, the index stays on
    /// top so `i` sees it.
    fn doloop(&mut self, t: Token) -> Result<Flow, RuntimeError> {
        let pf = self.children(t, Slot::Pf);
        let limit = self.rpop()?;

        let result = self.loop_body(limit, &pf);
        let popped = self.rpop();
        result?;
        popped?;
        Ok(Flow::Completed)
    }

    fn loop_body(&mut self, limit: Cell, pf: &[Token]) -> Result<(), RuntimeError> {
        loop {
            self.check_limits()?;
            if self.walk(pf)? == Flow::EarlyExit {
                return Ok(());
            }
            let top = self
                .rs
                .last_mut()
                .ok_or(ErrorKind::ReturnStackUnderflow)?;
            *top = top.wrapping_add(1);
            if *top >= limit {
                return Ok(());
            }
        }
    }

    /// Run-time half of `does>`: append the code following this node in the
    /// defining word to the newest entry, then end the defining word.
    fn does(&mut self, t: Token, def: Token) -> Flow {
        let tail: Vec<Token> = self
            .dict
            .body(def)
            .iter()
            .skip_while(|&&w| w != t)
            .skip(1)
            .copied()
            .collect();
        for w in tail {
            self.dict.compile(w);
        }
        Flow::EarlyExit
    }

    // Stack operations

    pub(crate) fn push(&mut self, v: Cell) -> Result<(), RuntimeError> {
        if self.ss.len() >= self.config.max_stack_size {
            return Err(ErrorKind::StackOverflow(self.config.max_stack_size).into());
        }
        self.ss.push(v);
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Result<Cell, RuntimeError> {
        self.ss
            .pop()
            .ok_or_else(|| ErrorKind::StackUnderflow.into())
    }

    /// Item `i` below the top, 0 being the top itself.
    pub(crate) fn peek(&self, i: usize) -> Result<Cell, RuntimeError> {
        self.ss
            .len()
            .checked_sub(i + 1)
            .map(|at| self.ss[at])
            .ok_or_else(|| ErrorKind::StackUnderflow.into())
    }

    /// Fail unless at least `n` items are on the data stack.
    pub(crate) fn need(&self, n: usize) -> Result<(), RuntimeError> {
        if self.ss.len() < n {
            return Err(ErrorKind::StackUnderflow.into());
        }
        Ok(())
    }

    pub(crate) fn rpush(&mut self, v: Cell) -> Result<(), RuntimeError> {
        if self.rs.len() >= self.config.max_stack_size {
            return Err(ErrorKind::StackOverflow(self.config.max_stack_size).into());
        }
        self.rs.push(v);
        Ok(())
    }

    pub(crate) fn rpop(&mut self) -> Result<Cell, RuntimeError> {
        self.rs
            .pop()
            .ok_or_else(|| ErrorKind::ReturnStackUnderflow.into())
    }

    pub(crate) fn rtop(&self) -> Result<Cell, RuntimeError> {
        self.rs
            .last()
            .copied()
            .ok_or_else(|| ErrorKind::ReturnStackUnderflow.into())
    }

    /// Decrement the loop index in place and return it.
    fn rdec(&mut self) -> Result<Cell, RuntimeError> {
        let top = self
            .rs
            .last_mut()
            .ok_or(ErrorKind::ReturnStackUnderflow)?;
        *top = top.wrapping_sub(1);
        Ok(*top)
    }
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}
