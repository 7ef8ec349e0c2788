//! # eForth data model
//!
//! This module defines the executable node (`Code`) stored in the dictionary,
//! the packed memory address handed to running programs, and the table of
//! native primitives the dictionary is booted with.
//!
//! ## Documentation conventions
//!
//! - Stack effects are written as `( before -- after )`.
//! - `pf`, `p1` and `p2` name the three child lists of a node: the main body,
//!   the `else`/`while`/`then` branch, and the `aft`..`next` section.
//! - A *token* identifies a node; it never changes and is never handed out
//!   twice. Named words count up from 0 and anonymous nodes from
//!   `FIRST_NODE`, so only words can appear in a packed address.

pub mod addr;
pub mod code;
pub mod prim;
