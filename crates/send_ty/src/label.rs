// ==============================================================================
// Canonical labels
// ==============================================================================
//
// Every combination, signature and call-site gets a deterministic name that is
// safe to use as a program identifier. ASCII alphanumerics are kept as-is and
// everything else is replaced by `_<mnemonic>_` using the table below.
// Whitespace is dropped. Mnemonics are alphanumeric and never empty, so a run
// of two underscores can only be a separator; that keeps labels injective.
//
//   ::  cc       (  lp       )  rp       <  lt       >  gt       =  eq
//   !   bang     ~  tilde    +  plus     -  minus    *  star     /  slash
//   %   pct      &  amp      ?  qm       [  lb       ]  rb       ,  comma
//   |   bar      _  us       :  colon    .  dot      ^  caret
//   anything else: u<lowercase hex code point>

use itertools::Itertools;
use smol_str::SmolStr;

use crate::{Combination, ConcreteTy, Constraint, TypeSignature};

/// Label used for the empty signature/combination. `none` is not a mnemonic,
/// so no escaped name can produce it.
pub const EMPTY_LABEL: &str = "_none_";

const POSITION_SEPARATOR: &str = "__";

/// Joins union members in a signature label. `or` is not a mnemonic either.
const MEMBER_SEPARATOR: &str = "_or_";

fn mnemonic(c: char) -> Option<&'static str> {
    let m = match c {
        '(' => "lp",
        ')' => "rp",
        '<' => "lt",
        '>' => "gt",
        '=' => "eq",
        '!' => "bang",
        '~' => "tilde",
        '+' => "plus",
        '-' => "minus",
        '*' => "star",
        '/' => "slash",
        '%' => "pct",
        '&' => "amp",
        '?' => "qm",
        '[' => "lb",
        ']' => "rb",
        ',' => "comma",
        '|' => "bar",
        '_' => "us",
        ':' => "colon",
        '.' => "dot",
        '^' => "caret",
        _ => return None,
    };
    Some(m)
}

/// Escape an arbitrary name (type or method) into identifier-safe text.
pub fn escape(name: &str) -> SmolStr {
    let mut out = String::with_capacity(name.len());
    let mut chars = name.chars().filter(|c| !c.is_whitespace()).peekable();

    while let Some(c) = chars.next() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
            continue;
        }

        if c == ':' && chars.peek() == Some(&':') {
            chars.next();
            out.push_str("_cc_");
            continue;
        }

        out.push('_');
        match mnemonic(c) {
            Some(m) => out.push_str(m),
            None => out.push_str(&format!("u{:x}", c as u32)),
        }
        out.push('_');
    }

    out.into()
}

pub fn type_label(ty: &ConcreteTy) -> SmolStr {
    escape(ty.name())
}

/// `Int32__String` for `(Int32, String)`.
pub fn combination_label(combo: &Combination) -> SmolStr {
    if combo.is_empty() {
        return EMPTY_LABEL.into();
    }
    combo.iter().map(type_label).join(POSITION_SEPARATOR).into()
}

fn constraint_label(constraint: &Constraint) -> String {
    constraint.members().map(type_label).join(MEMBER_SEPARATOR)
}

/// `String__Int32_or_Float64` for `(String, Int32 | Float64)`.
pub fn signature_label(sig: &TypeSignature) -> SmolStr {
    if sig.is_empty() {
        return EMPTY_LABEL.into();
    }
    sig.iter().map(constraint_label).join(POSITION_SEPARATOR).into()
}

/// Identifier of the call-site for `method` declared with `sig`.
pub fn callsite_ident(method: &str, sig: &TypeSignature) -> SmolStr {
    format!("Send_{}_{}", escape(method), signature_label(sig)).into()
}

/// Identifier of the lookup table for one combination.
pub fn table_ident(combo: &Combination) -> SmolStr {
    format!("SendLookup___{}", combination_label(combo)).into()
}

/// Whether `s` is usable as an identifier: ASCII alphanumerics and
/// underscores, not starting with a digit.
pub fn is_identifier_safe(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
