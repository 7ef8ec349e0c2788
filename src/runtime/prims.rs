use crate::frontend::format;
use crate::frontend::io::{Dot, clock};
use crate::lang::addr::Addr;
use crate::lang::code::Cell;
use crate::lang::prim::Prim;
use crate::runtime::runtime_error::{ErrorKind, RuntimeError};
use crate::runtime::vm::{Flow, Vm};
use std::time::Duration;

/// Mask applied by the unsigned words.
const UMASK: Cell = 0x7fff_ffff;

fn flag(b: bool) -> Cell {
    if b { -1 } else { 0 }
}

impl Vm {
    /// Run a native primitive.
    pub(crate) fn prim(&mut self, p: Prim) -> Result<Flow, RuntimeError> {
        match p {
            Prim::Bye => self.run = false,

            // Arithmetic
            Prim::Add => self.alu2(|n, t| n.wrapping_add(t))?,
            Prim::Sub => self.alu2(|n, t| n.wrapping_sub(t))?,
            Prim::Mul => self.alu2(|n, t| n.wrapping_mul(t))?,
            Prim::Div => self.div2(|n, t| n.wrapping_div(t))?,
            Prim::Mod => self.div2(|n, t| n.wrapping_rem(t))?,
            Prim::MulDiv => {
                let d = self.pop()?;
                let m = self.pop()? as i64 * self.pop()? as i64;
                if d == 0 {
                    return Err(ErrorKind::DivisionByZero.into());
                }
                self.push((m / d as i64) as Cell)?;
            }
            Prim::MulDivMod => {
                let d = self.pop()?;
                let m = self.pop()? as i64 * self.pop()? as i64;
                if d == 0 {
                    return Err(ErrorKind::DivisionByZero.into());
                }
                self.push((m % d as i64) as Cell)?;
                self.push((m / d as i64) as Cell)?;
            }
            Prim::And => self.alu2(|n, t| n & t)?,
            Prim::Or => self.alu2(|n, t| n | t)?,
            Prim::Xor => self.alu2(|n, t| n ^ t)?,
            Prim::Abs => self.alu1(|n| n.wrapping_abs())?,
            Prim::Negate => self.alu1(|n| n.wrapping_neg())?,
            Prim::Invert => self.alu1(|n| !n)?,
            Prim::Rshift => self.alu2(|n, t| (n as u32).wrapping_shr(t as u32) as Cell)?,
            Prim::Lshift => self.alu2(|n, t| n.wrapping_shl(t as u32))?,
            Prim::Max => self.alu2(|n, t| n.max(t))?,
            Prim::Min => self.alu2(|n, t| n.min(t))?,
            Prim::TwoMul => self.alu1(|n| n.wrapping_mul(2))?,
            Prim::TwoDiv => self.alu1(|n| n / 2)?,
            Prim::OnePlus => self.alu1(|n| n.wrapping_add(1))?,
            Prim::OneMinus => self.alu1(|n| n.wrapping_sub(1))?,

            // Comparison
            Prim::ZeroEq => self.alu1(|n| flag(n == 0))?,
            Prim::ZeroLt => self.alu1(|n| flag(n < 0))?,
            Prim::ZeroGt => self.alu1(|n| flag(n > 0))?,
            Prim::Eq => self.alu2(|n, t| flag(n == t))?,
            Prim::Gt => self.alu2(|n, t| flag(n > t))?,
            Prim::Lt => self.alu2(|n, t| flag(n < t))?,
            Prim::Ne => self.alu2(|n, t| flag(n != t))?,
            Prim::Ge => self.alu2(|n, t| flag(n >= t))?,
            Prim::Le => self.alu2(|n, t| flag(n <= t))?,
            Prim::ULt => self.alu2(|n, t| flag((n & UMASK) < (t & UMASK)))?,
            Prim::UGt => self.alu2(|n, t| flag((n & UMASK) > (t & UMASK)))?,

            // Data stack
            Prim::Dup => {
                let n = self.peek(0)?;
                self.push(n)?;
            }
            Prim::Drop => {
                self.pop()?;
            }
            Prim::Over => {
                let n = self.peek(1)?;
                self.push(n)?;
            }
            Prim::Swap => {
                self.need(2)?;
                let len = self.ss.len();
                self.ss.swap(len - 1, len - 2);
            }
            Prim::Rot => self.roll(2)?,
            Prim::MinusRot => {
                let c = self.pop()?;
                self.need(2)?;
                let len = self.ss.len();
                self.ss.insert(len - 2, c);
            }
            Prim::Pick => {
                let i = self.pop()?;
                let n = self.peek(self.depth_index(i)?)?;
                self.push(n)?;
            }
            Prim::Roll => {
                let i = self.pop()?;
                let i = self.depth_index(i)?;
                self.roll(i)?;
            }
            Prim::Nip => {
                let n = self.pop()?;
                self.pop()?;
                self.push(n)?;
            }
            Prim::QDup => {
                let n = self.peek(0)?;
                if n != 0 {
                    self.push(n)?;
                }
            }
            Prim::TwoDup => {
                let a = self.peek(1)?;
                let b = self.peek(0)?;
                self.push(a)?;
                self.push(b)?;
            }
            Prim::TwoDrop => {
                self.need(2)?;
                self.ss.truncate(self.ss.len() - 2);
            }
            Prim::TwoSwap => {
                self.roll(3)?;
                self.roll(3)?;
            }
            Prim::TwoOver => {
                let a = self.peek(3)?;
                let b = self.peek(2)?;
                self.push(a)?;
                self.push(b)?;
            }

            // Return stack
            Prim::ToR | Prim::Push => {
                let n = self.pop()?;
                self.rpush(n)?;
            }
            Prim::RFrom | Prim::Pop => {
                let n = self.rpop()?;
                self.push(n)?;
            }
            Prim::RFetch | Prim::I => {
                let n = self.rtop()?;
                self.push(n)?;
            }

            // Console
            Prim::Hex => self.set_base(16)?,
            Prim::Decimal => self.set_base(10)?,
            Prim::Cr => self.io.cr(),
            Prim::Bl => self.io.bl(),
            Prim::Dot => {
                let n = self.pop()?;
                self.io.dot(Dot::Dot, n, 0, self.base);
            }
            Prim::UDot => {
                let n = self.pop()?;
                self.io.dot(Dot::UDot, n, 0, self.base);
            }
            Prim::DotR => {
                let w = self.pop()?;
                let n = self.pop()?;
                self.io.dot(Dot::DotR, n, w, self.base);
            }
            Prim::UDotR => {
                let w = self.pop()?;
                let n = self.pop()?;
                self.io.dot(Dot::UDotR, n, w, self.base);
            }
            Prim::Type => {
                self.pop()?;
                let addr = self.pop()?;
                let text = self.text_at(addr)?;
                self.io.pstr(&text);
            }
            Prim::Key => {
                let k = self.io.key();
                self.push(k)?;
            }
            Prim::Emit => {
                let n = self.pop()?;
                self.io.dot(Dot::Emit, n, 0, self.base);
            }
            Prim::Space => self.io.spaces(1),
            Prim::Spaces => {
                let n = self.pop()?;
                self.io.spaces(n);
            }

            // Literals and comments
            Prim::Paren => {
                self.io.scan(')');
            }
            Prim::DotParen => {
                let text = self.io.scan(')').unwrap_or_default();
                self.io.pstr(&text);
            }
            Prim::Backslash => {
                self.io.scan('\n');
            }
            Prim::SQuote => self.s_quote()?,
            Prim::DotQuote => self.dot_quote(),

            // Branching and loops
            Prim::If => self.if_(),
            Prim::Else => self.else_()?,
            Prim::Then => self.then()?,
            Prim::Begin => self.begin(),
            Prim::While => self.while_()?,
            Prim::Repeat => self.repeat()?,
            Prim::Again => self.again()?,
            Prim::Until => self.until()?,
            Prim::For => self.for_(),
            Prim::Aft => self.aft()?,
            Prim::Next => self.next()?,
            Prim::Do => self.do_(),
            Prim::Loop => self.loop_()?,
            Prim::Leave | Prim::Exit => return Ok(Flow::EarlyExit),

            // Compiler
            Prim::LBracket => self.compile = false,
            Prim::RBracket => self.compile = true,
            Prim::Colon => self.colon(),
            Prim::Semicolon => self.semicolon(),
            Prim::Variable => self.variable(1)?,
            Prim::Constant => self.constant()?,
            Prim::Postpone => self.postpone(),
            Prim::Immediate => self.immediate(),
            Prim::Exec => return self.exec(),
            Prim::Create => self.variable(0)?,
            Prim::Does => self.does_compile(),
            Prim::To => self.to()?,
            Prim::Is => self.is()?,

            // Memory
            Prim::Fetch => {
                let addr = self.pop()?;
                let v = self.dict.get_cell(addr)?;
                self.push(v)?;
            }
            Prim::Store => {
                let addr = self.pop()?;
                let v = self.pop()?;
                self.store(addr, v)?;
            }
            Prim::PlusStore => {
                let addr = self.pop()?;
                let v = self.dict.get_cell(addr)?;
                let n = self.pop()?;
                self.store(addr, v.wrapping_add(n))?;
            }
            Prim::Query => {
                let addr = self.pop()?;
                let v = self.dict.get_cell(addr)?;
                self.io.dot(Dot::Dot, v, 0, self.base);
            }
            Prim::Comma => {
                let v = self.pop()?;
                self.dict.comma(v)?;
            }
            Prim::Cells => {}
            Prim::Allot => {
                let n = self.pop()?;
                for _ in 0..n.max(0) {
                    self.dict.comma(0)?;
                }
            }
            Prim::Th => {
                let i = self.pop()?;
                let cell = self.pop()?;
                let addr = Addr::decode(cell).ok_or(ErrorKind::InvalidAddress(cell))?;
                self.push(addr.index(i)?.encode())?;
            }

            // Debug and system
            Prim::Here => self.push(self.dict.here() as Cell)?,
            Prim::Tick => {
                if let Some(w) = self.tick() {
                    self.push(w as Cell)?;
                }
            }
            Prim::DotS => self.io.ss_dump(&self.ss, self.base),
            Prim::Words => format::words(&mut self.io, &self.dict),
            Prim::See => {
                if let Some(w) = self.tick() {
                    format::see(&mut self.io, &self.dict, w, self.base);
                }
            }
            Prim::Clock => self.push(clock())?,
            Prim::Rnd => {
                let bound = self.pop()?;
                let n = self.io.rnd(bound)?;
                self.push(n)?;
            }
            Prim::Depth => self.push(self.ss.len() as Cell)?,
            Prim::RDepth => self.push(self.rs.len() as Cell)?,
            Prim::Include => {
                if let Some(path) = self.io.next_token() {
                    self.load(&path);
                }
            }
            Prim::Included => {
                self.pop()?;
                let addr = self.pop()?;
                let path = self.text_at(addr)?;
                self.load(&path);
            }
            Prim::Ok => self.banner(),
            Prim::Ms => {
                let n = self.pop()?;
                std::thread::sleep(Duration::from_millis(n.max(0) as u64));
            }
            Prim::Forget => {
                if let Some(w) = self.tick() {
                    self.dict.forget(w.max(self.fence + 1));
                }
            }
            Prim::Boot => self.dict.forget(self.fence + 1),
        }
        Ok(Flow::Completed)
    }

    fn alu1(&mut self, f: impl FnOnce(Cell) -> Cell) -> Result<(), RuntimeError> {
        let n = self.pop()?;
        self.push(f(n))
    }

    fn alu2(&mut self, f: impl FnOnce(Cell, Cell) -> Cell) -> Result<(), RuntimeError> {
        let t = self.pop()?;
        let n = self.pop()?;
        self.push(f(n, t))
    }

    fn div2(&mut self, f: impl FnOnce(Cell, Cell) -> Cell) -> Result<(), RuntimeError> {
        let t = self.pop()?;
        let n = self.pop()?;
        if t == 0 {
            return Err(ErrorKind::DivisionByZero.into());
        }
        self.push(f(n, t))
    }

    /// Move item `i` below the top to the top.
    fn roll(&mut self, i: usize) -> Result<(), RuntimeError> {
        self.need(i + 1)?;
        let n = self.ss.remove(self.ss.len() - 1 - i);
        self.ss.push(n);
        Ok(())
    }

    fn depth_index(&self, i: Cell) -> Result<usize, RuntimeError> {
        usize::try_from(i).map_err(|_| ErrorKind::InvalidIndex(i).into())
    }

    fn set_base(&mut self, base: Cell) -> Result<(), RuntimeError> {
        self.store(Addr::BASE.encode(), base)
    }

    /// Store into a cell; writes to the base cell also switch the radix.
    fn store(&mut self, addr: Cell, v: Cell) -> Result<(), RuntimeError> {
        self.dict.set_cell(addr, v)?;
        if addr == Addr::BASE.encode() {
            self.base = v;
        }
        Ok(())
    }

    /// String at an address: the pad for negative addresses, otherwise a
    /// compiled string literal.
    fn text_at(&self, addr: Cell) -> Result<String, RuntimeError> {
        let text = if addr < 0 {
            self.io.pad()
        } else {
            self.dict.string_at(addr)
        };
        text.map(str::to_string)
            .ok_or_else(|| ErrorKind::InvalidAddress(addr).into())
    }
}

#[cfg(test)]
mod tests {
    use crate::frontend::io::{Capture, Io};
    use crate::lang::code::Cell;
    use crate::runtime::config::VmConfig;
    use crate::runtime::vm::Vm;

    // ============================================================
    // Test Helpers
    // ============================================================

    fn vm() -> (Vm, Capture, Capture) {
        let out = Capture::new();
        let err = Capture::new();
        let io = Io::new("test", Box::new(out.clone()), Box::new(err.clone()));
        let config = VmConfig {
            prompt: false,
            seed: Some(42),
            ..VmConfig::default()
        };
        (Vm::with_io(io, config), out, err)
    }

    fn assert_stack(src: &str, expected: &[Cell]) {
        let (mut vm, _, err) = vm();
        vm.eval(src);
        assert_eq!(vm.stack(), expected, "stack mismatch for '{}'", src);
        assert_eq!(err.contents(), "", "unexpected error for '{}'", src);
    }

    fn assert_output(src: &str, expected: &str) {
        let (mut vm, out, _) = vm();
        vm.eval(src);
        assert_eq!(out.contents(), expected, "output mismatch for '{}'", src);
    }

    fn assert_error(src: &str, error_contains: &str) {
        let (mut vm, _, err) = vm();
        vm.eval(src);
        let text = err.contents();
        assert!(
            text.contains(error_contains),
            "expected error containing '{}', got: {}",
            error_contains,
            text
        );
    }

    // ============================================================
    // Arithmetic
    // ============================================================

    #[test]
    fn test_basic_arithmetic() {
        assert_stack("7 3 -", &[4]);
        assert_stack("6 7 *", &[42]);
        assert_stack("-7 2 /", &[-3]);
        assert_stack("7 3 mod", &[1]);
        assert_stack("-7 3 mod", &[-1]);
        assert_stack("-7 abs", &[7]);
        assert_stack("5 negate", &[-5]);
    }

    #[test]
    fn test_division_by_zero() {
        assert_error("1 0 /", "division by zero");
        assert_error("1 0 mod", "division by zero");
        assert_error("1 2 0 */", "division by zero");
    }

    #[test]
    fn test_scaled_division_uses_wide_product() {
        assert_stack("100000 100000 1000 */", &[10_000_000]);
        assert_stack("7 5 3 */mod", &[2, 11]);
    }

    #[test]
    fn test_wrapping() {
        assert_stack("2147483647 1 +", &[i32::MIN]);
        assert_stack("-2147483648 abs", &[i32::MIN]);
    }

    #[test]
    fn test_bits() {
        assert_stack("0 invert", &[-1]);
        assert_stack("5 invert", &[-6]);
        assert_stack("-1 28 rshift", &[15]);
        assert_stack("1 4 lshift", &[16]);
        assert_stack("12 10 and 12 10 or 12 10 xor", &[8, 14, 6]);
    }

    #[test]
    fn test_comparisons() {
        assert_stack("1 2 < 2 1 < 3 3 =", &[-1, 0, -1]);
        assert_stack("0 0= 5 0< -5 0< 5 0>", &[-1, 0, -1, -1]);
        assert_stack("-1 1 u<", &[0]);
        assert_stack("3 9 max 3 9 min", &[9, 3]);
    }

    // ============================================================
    // Stack words
    // ============================================================

    #[test]
    fn test_stack_words() {
        assert_stack("1 2 swap", &[2, 1]);
        assert_stack("1 2 over", &[1, 2, 1]);
        assert_stack("1 2 3 rot", &[2, 3, 1]);
        assert_stack("1 2 3 -rot", &[3, 1, 2]);
        assert_stack("1 2 nip", &[2]);
        assert_stack("0 ?dup 4 ?dup", &[0, 4, 4]);
        assert_stack("10 20 30 2 pick", &[10, 20, 30, 10]);
        assert_stack("10 20 30 2 roll", &[20, 30, 10]);
        assert_stack("1 2 3 4 2swap", &[3, 4, 1, 2]);
        assert_stack("1 2 3 4 2over", &[1, 2, 3, 4, 1, 2]);
        assert_stack("1 2 2dup", &[1, 2, 1, 2]);
        assert_stack("1 2 3 2drop", &[1]);
    }

    #[test]
    fn test_stack_underflow() {
        assert_error("swap", "stack underflow");
        assert_error("1 over", "stack underflow");
        assert_error("1 2 5 pick", "stack underflow");
        assert_error("1 -1 pick", "invalid index -1");
    }

    #[test]
    fn test_return_stack() {
        assert_stack("5 >r r@ r> ", &[5, 5]);
        assert_stack("7 push pop", &[7]);
        assert_error("r>", "return stack underflow");
    }

    #[test]
    fn test_depths() {
        assert_stack("1 2 3 depth", &[1, 2, 3, 3]);
        assert_stack("r", &[0]);
    }

    // ============================================================
    // Console
    // ============================================================

    #[test]
    fn test_number_output() {
        assert_output("42 .", "42 ");
        assert_output("-1 u.", "2147483647 ");
        assert_output("7 4 .r", "   7");
        assert_output("255 hex . decimal 255 .", "ff 255 ");
        assert_output("72 emit 105 emit", "Hi");
        assert_output("3 spaces -2 spaces space", "    ");
        assert_output("1 . bl 2 .", "1  2 ");
        assert_output("1 -2147483648 .r 5 .", "15 ");
    }

    #[test]
    fn test_comments() {
        assert_stack("1 ( 2 3 ) 4 \\ 5 6", &[1, 4]);
        assert_output(".( hello) 1 .", "hello1 ");
    }

    #[test]
    fn test_dot_s() {
        assert_output("1 2 3 .s", "1 2 3 ");
    }

    // ============================================================
    // Memory
    // ============================================================

    #[test]
    fn test_variables() {
        assert_stack("variable x 9 x ! x @", &[9]);
        assert_stack("variable x 2 x ! 3 x +! x @", &[5]);
        assert_output("variable x 11 x ! x ?", "11 ");
    }

    #[test]
    fn test_allot_and_th() {
        assert_stack("variable a 2 allot 7 a 2 th ! a 2 th @ a 1 th @", &[7, 0]);
        assert_error("variable a a 3 th @", "invalid address");
    }

    #[test]
    fn test_bad_address() {
        assert_error("-1 @", "invalid address -1");
        assert_error("5 100000 !", "invalid address");
    }

    // ============================================================
    // System
    // ============================================================

    #[test]
    fn test_here_counts_words_only() {
        // literals take no word token
        assert_stack("here : w 1 2 3 ; here swap -", &[1]);
        assert_stack("here variable v 5 for 1 drop next here swap -", &[1]);
    }

    #[test]
    fn test_exec() {
        assert_stack("3 ' dup exec", &[3, 3]);
        assert_error("99999 exec", "invalid token 99999");
    }

    #[test]
    fn test_rnd_in_range() {
        let (mut vm, _, _) = vm();
        for _ in 0..20 {
            vm.eval("6 rnd");
        }
        assert!(vm.stack().iter().all(|n| (0..6).contains(n)));
        assert_error("0 rnd", "invalid range 0");
    }

    #[test]
    fn test_forget_and_boot() {
        let (mut vm, _, _) = vm();
        let booted = vm.dict().len();
        vm.eval(": a 1 ; : b 2 ; : c 3 ;");
        vm.eval("forget b");
        assert!(vm.dict().find("a", false).is_some());
        assert!(vm.dict().find("b", false).is_none());
        assert!(vm.dict().find("c", false).is_none());
        vm.eval("boot");
        assert_eq!(vm.dict().len(), booted);

        // built-ins survive; everything after them goes
        vm.eval(": d 4 ;");
        vm.eval("forget dup");
        assert!(vm.dict().find("dup", false).is_some());
        assert!(vm.dict().find("d", false).is_none());
        assert_eq!(vm.dict().len(), booted);
    }

    #[test]
    fn test_bye_stops_line() {
        let (mut vm, _, _) = vm();
        assert!(!vm.eval("1 bye 2"));
        assert_eq!(vm.stack(), &[1]);
    }
}
