use crate::frontend::io::{Io, itoa};
use crate::lang::code::{Cell, Token, Xt};
use crate::runtime::dict::Dict;

/// Line width `words` wraps at.
const WORDS_WIDTH: usize = 64;

/// List every named entry, oldest first.
pub fn words(io: &mut Io, dict: &Dict) {
    let mut width = 0;
    for w in dict.entries() {
        if w.name.is_empty() {
            continue;
        }
        io.pstr(&format!("  {}", w.name));
        width += w.name.len() + 2;
        if width > WORDS_WIDTH {
            io.cr();
            width = 0;
        }
    }
    io.cr();
}

/// Decompile a word: its body tree, branch sections, slots and text.
pub fn see(io: &mut Io, dict: &Dict, token: Token, base: Cell) {
    see_node(io, dict, token, base, 0);
}

fn see_node(io: &mut Io, dict: &Dict, token: Token, base: Cell, depth: usize) {
    let Some(c) = dict.get(token) else {
        return;
    };
    let tab = |io: &mut Io, s: &str| {
        if depth > 0 {
            io.cr();
        }
        io.pstr(&"  ".repeat(depth));
        io.pstr(s);
    };

    // loop set-up nodes are implied by the loop that follows
    if c.name != "\t" {
        let lead = if depth == 0 { ": " } else { "" };
        tab(io, &format!("{}{} ", lead, c.name));
    }

    // named words met inside a body are shown by name only
    let expand = depth == 0 || !matches!(c.xt, Xt::Prim(_) | Xt::Colon);
    if expand {
        for &w in dict.body(token) {
            see_node(io, dict, w, base, depth + 1);
        }
        if !c.p1.is_empty() {
            tab(io, "( 1-- )");
            for &w in &c.p1 {
                see_node(io, dict, w, base, depth + 1);
            }
        }
        if !c.p2.is_empty() {
            tab(io, "( 2-- )");
            for &w in &c.p2 {
                see_node(io, dict, w, base, depth + 1);
            }
        }
        if !c.qf.is_empty() {
            io.pstr(" \\ =");
            for &v in &c.qf {
                io.pstr(&format!("{} ", itoa(v, base)));
            }
        }
        if let Some(text) = &c.text {
            io.pstr(&format!(" \\ =\"{}\" ", text));
        }
    }

    if depth == 0 {
        io.pstr("\n;\n");
    }
}
