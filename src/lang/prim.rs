// =============================================================================
// PRIM - Native primitives
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prim {
    Bye,

    // arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    MulDiv,
    MulDivMod,
    And,
    Or,
    Xor,
    Abs,
    Negate,
    Invert,
    Rshift,
    Lshift,
    Max,
    Min,
    TwoMul,
    TwoDiv,
    OnePlus,
    OneMinus,

    // logic
    ZeroEq,
    ZeroLt,
    ZeroGt,
    Eq,
    Gt,
    Lt,
    Ne,
    Ge,
    Le,
    ULt,
    UGt,

    // data stack
    Dup,
    Drop,
    Over,
    Swap,
    Rot,
    MinusRot,
    Pick,
    Roll,
    Nip,
    QDup,
    TwoDup,
    TwoDrop,
    TwoSwap,
    TwoOver,

    // return stack
    ToR,
    RFrom,
    RFetch,
    I,
    Push,
    Pop,

    // I/O
    Hex,
    Decimal,
    Cr,
    Bl,
    Dot,
    UDot,
    DotR,
    UDotR,
    Type,
    Key,
    Emit,
    Space,
    Spaces,

    // literals and comments
    Paren,
    DotParen,
    Backslash,
    SQuote,
    DotQuote,

    // ==========================================================================
    // Control flow compiler
    // ==========================================================================
    If,
    Else,
    Then,
    Begin,
    While,
    Repeat,
    Again,
    Until,
    For,
    Aft,
    Next,
    Do,
    Leave,
    Loop,

    // compiler
    LBracket,
    RBracket,
    Colon,
    Semicolon,
    Variable,
    Constant,
    Postpone,
    Immediate,
    Exit,
    Exec,
    Create,
    Does,
    To,
    Is,

    // memory
    Fetch,
    Store,
    PlusStore,
    Query,
    Comma,
    Cells,
    Allot,
    Th,

    // debug and system
    Here,
    Tick,
    DotS,
    Words,
    See,
    Clock,
    Rnd,
    Depth,
    RDepth,
    Include,
    Included,
    Ok,
    Ms,
    Forget,
    Boot,
}

/// Boot table: `(name, primitive, immediate)` in dictionary order.
///
/// `boot` must stay last; `forget` never truncates below it.
pub const PRIMITIVES: &[(&str, Prim, bool)] = &[
    ("bye", Prim::Bye, false),
    ("+", Prim::Add, false),
    ("-", Prim::Sub, false),
    ("*", Prim::Mul, false),
    ("/", Prim::Div, false),
    ("mod", Prim::Mod, false),
    ("*/", Prim::MulDiv, false),
    ("*/mod", Prim::MulDivMod, false),
    ("and", Prim::And, false),
    ("or", Prim::Or, false),
    ("xor", Prim::Xor, false),
    ("abs", Prim::Abs, false),
    ("negate", Prim::Negate, false),
    ("invert", Prim::Invert, false),
    ("rshift", Prim::Rshift, false),
    ("lshift", Prim::Lshift, false),
    ("max", Prim::Max, false),
    ("min", Prim::Min, false),
    ("2*", Prim::TwoMul, false),
    ("2/", Prim::TwoDiv, false),
    ("1+", Prim::OnePlus, false),
    ("1-", Prim::OneMinus, false),
    ("0=", Prim::ZeroEq, false),
    ("0<", Prim::ZeroLt, false),
    ("0>", Prim::ZeroGt, false),
    ("=", Prim::Eq, false),
    (">", Prim::Gt, false),
    ("<", Prim::Lt, false),
    ("<>", Prim::Ne, false),
    (">=", Prim::Ge, false),
    ("<=", Prim::Le, false),
    ("u<", Prim::ULt, false),
    ("u>", Prim::UGt, false),
    ("dup", Prim::Dup, false),
    ("drop", Prim::Drop, false),
    ("over", Prim::Over, false),
    ("swap", Prim::Swap, false),
    ("rot", Prim::Rot, false),
    ("-rot", Prim::MinusRot, false),
    ("pick", Prim::Pick, false),
    ("roll", Prim::Roll, false),
    ("nip", Prim::Nip, false),
    ("?dup", Prim::QDup, false),
    ("2dup", Prim::TwoDup, false),
    ("2drop", Prim::TwoDrop, false),
    ("2swap", Prim::TwoSwap, false),
    ("2over", Prim::TwoOver, false),
    (">r", Prim::ToR, false),
    ("r>", Prim::RFrom, false),
    ("r@", Prim::RFetch, false),
    ("i", Prim::I, false),
    ("push", Prim::Push, false),
    ("pop", Prim::Pop, false),
    ("hex", Prim::Hex, false),
    ("decimal", Prim::Decimal, false),
    ("cr", Prim::Cr, false),
    ("bl", Prim::Bl, false),
    (".", Prim::Dot, false),
    ("u.", Prim::UDot, false),
    (".r", Prim::DotR, false),
    ("u.r", Prim::UDotR, false),
    ("type", Prim::Type, false),
    ("key", Prim::Key, false),
    ("emit", Prim::Emit, false),
    ("space", Prim::Space, false),
    ("spaces", Prim::Spaces, false),
    ("(", Prim::Paren, true),
    (".(", Prim::DotParen, true),
    ("\\", Prim::Backslash, true),
    ("s\"", Prim::SQuote, true),
    (".\"", Prim::DotQuote, true),
    ("if", Prim::If, true),
    ("else", Prim::Else, true),
    ("then", Prim::Then, true),
    ("begin", Prim::Begin, true),
    ("while", Prim::While, true),
    ("repeat", Prim::Repeat, true),
    ("again", Prim::Again, true),
    ("until", Prim::Until, true),
    ("for", Prim::For, true),
    ("aft", Prim::Aft, true),
    ("next", Prim::Next, true),
    ("do", Prim::Do, true),
    ("leave", Prim::Leave, false),
    ("loop", Prim::Loop, true),
    ("[", Prim::LBracket, true),
    ("]", Prim::RBracket, false),
    (":", Prim::Colon, false),
    (";", Prim::Semicolon, true),
    ("variable", Prim::Variable, false),
    ("constant", Prim::Constant, false),
    ("postpone", Prim::Postpone, true),
    ("immediate", Prim::Immediate, false),
    ("exit", Prim::Exit, false),
    ("exec", Prim::Exec, false),
    ("create", Prim::Create, false),
    ("does>", Prim::Does, true),
    ("to", Prim::To, false),
    ("is", Prim::Is, false),
    ("@", Prim::Fetch, false),
    ("!", Prim::Store, false),
    ("+!", Prim::PlusStore, false),
    ("?", Prim::Query, false),
    (",", Prim::Comma, false),
    ("cells", Prim::Cells, false),
    ("allot", Prim::Allot, false),
    ("th", Prim::Th, false),
    ("here", Prim::Here, false),
    ("'", Prim::Tick, false),
    (".s", Prim::DotS, false),
    ("words", Prim::Words, false),
    ("see", Prim::See, false),
    ("clock", Prim::Clock, false),
    ("rnd", Prim::Rnd, false),
    ("depth", Prim::Depth, false),
    ("r", Prim::RDepth, false),
    ("include", Prim::Include, true),
    ("included", Prim::Included, false),
    ("ok", Prim::Ok, false),
    ("ms", Prim::Ms, false),
    ("forget", Prim::Forget, false),
    ("boot", Prim::Boot, false),
];
