//! Grammar productions for GSC/CSC.
//!
//! This module implements all `parse_*` methods as an extension of `Parser`.
//! Script-level items live in `items`, statements in `statements`, and the
//! expression precedence ladder in `expressions`.

mod expressions;
mod items;
mod statements;
