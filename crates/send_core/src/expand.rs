// ==============================================================================
// Union expansion
// ==============================================================================
//
// A signature with union positions stands for every tuple that picks one
// member per position. We enumerate them with a mixed-radix counter: position
// `i` has radix `k_i` (its member count) and the rightmost position is the
// fastest digit, so `(A | B, C | D)` yields `(A, C), (A, D), (B, C), (B, D)`.
// Union members are kept in sorted order, which makes the output a pure
// function of the signature.

use std::borrow::Borrow;

use la_arena::{Arena, Idx};
use rustc_hash::FxHashMap;
use send_ty::{Combination, ConcreteTy, TypeSignature};

pub type ComboId = Idx<Combination>;

/// Every combination `sig` stands for, in odometer order. Produces exactly
/// `sig.combination_count()` distinct combinations; an empty signature yields
/// the single empty combination.
pub fn expand(sig: &TypeSignature) -> Vec<Combination> {
    let radices: Vec<usize> = sig.iter().map(|c| c.radix()).collect();
    let total = sig.combination_count();
    let mut digits = vec![0usize; radices.len()];
    let mut out = Vec::with_capacity(total);

    for _ in 0..total {
        let combo: Combination = sig
            .iter()
            .zip(&digits)
            .filter_map(|(constraint, &digit)| constraint.member(digit).cloned())
            .collect();
        debug_assert_eq!(combo.len(), sig.len());
        out.push(combo);

        // tick: rightmost digit first, carrying to the left
        for pos in (0..digits.len()).rev() {
            digits[pos] += 1;
            if digits[pos] < radices[pos] {
                break;
            }
            digits[pos] = 0;
        }
    }

    out
}

/// Interns combinations across all methods of a type. Ids are handed out in
/// first-seen order and never change.
#[derive(Debug, Default, Clone)]
pub struct CombinationSet {
    arena: Arena<Combination>,
    ids: FxHashMap<Combination, ComboId>,
}

impl CombinationSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, combo: Combination) -> ComboId {
        if let Some(&id) = self.ids.get(&combo) {
            return id;
        }
        let id = self.arena.alloc(combo.clone());
        self.ids.insert(combo, id);
        id
    }

    pub fn get<Q>(&self, combo: &Q) -> Option<ComboId>
    where
        Combination: Borrow<Q>,
        Q: std::hash::Hash + Eq + ?Sized,
    {
        self.ids.get(combo).copied()
    }

    pub fn lookup(&self, types: &[ConcreteTy]) -> Option<ComboId> {
        self.get(types)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ComboId, &Combination)> + '_ {
        self.arena.iter()
    }
}

impl std::ops::Index<ComboId> for CombinationSet {
    type Output = Combination;

    fn index(&self, id: ComboId) -> &Combination {
        &self.arena[id]
    }
}
