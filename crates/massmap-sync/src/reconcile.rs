//! Annotation reconciliation: previous rendered set + incoming snapshot →
//! minimal rendering operations.
//!
//! Computes which entities must be added, which ids must be removed and which
//! entities changed in place, so the surface only redraws what moved.

use std::collections::HashMap;

use massmap_core::entity::Entity;

// ─── EntitySet ───────────────────────────────────────────────────────────────

/// An insertion-ordered collection of entities keyed by identifier.
///
/// Inserting an id that is already present replaces the stored entity but
/// keeps its original position.
#[derive(Debug, Clone)]
pub struct EntitySet<E> {
  entries: Vec<E>,
  index:   HashMap<String, usize>,
}

impl<E> Default for EntitySet<E> {
  fn default() -> Self {
    Self {
      entries: Vec::new(),
      index:   HashMap::new(),
    }
  }
}

impl<E: Entity> EntitySet<E> {
  pub fn new() -> Self { Self::default() }

  /// Insert `entity`, returning the entity it replaced, if any.
  pub fn insert(&mut self, entity: E) -> Option<E> {
    match self.index.get(entity.identifier()) {
      Some(&slot) => Some(std::mem::replace(&mut self.entries[slot], entity)),
      None => {
        self
          .index
          .insert(entity.identifier().to_string(), self.entries.len());
        self.entries.push(entity);
        None
      }
    }
  }

  pub fn get(&self, id: &str) -> Option<&E> {
    self.index.get(id).map(|&slot| &self.entries[slot])
  }

  pub fn contains(&self, id: &str) -> bool { self.index.contains_key(id) }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }

  pub fn iter(&self) -> std::slice::Iter<'_, E> { self.entries.iter() }

  pub fn ids(&self) -> impl Iterator<Item = &str> {
    self.entries.iter().map(Entity::identifier)
  }
}

impl<E: Entity> FromIterator<E> for EntitySet<E> {
  fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
    let mut set = Self::new();
    for entity in iter {
      set.insert(entity);
    }
    set
  }
}

impl<E> IntoIterator for EntitySet<E> {
  type Item = E;
  type IntoIter = std::vec::IntoIter<E>;

  fn into_iter(self) -> Self::IntoIter { self.entries.into_iter() }
}

impl<'a, E> IntoIterator for &'a EntitySet<E> {
  type Item = &'a E;
  type IntoIter = std::slice::Iter<'a, E>;

  fn into_iter(self) -> Self::IntoIter { self.entries.iter() }
}

// ─── Reconciliation ──────────────────────────────────────────────────────────

/// The operations that transform one rendered set into another.
#[derive(Debug, Clone)]
pub struct Reconciliation<E> {
  pub to_add:    Vec<E>,
  pub to_remove: Vec<String>,
  pub to_update: Vec<E>,
}

impl<E> Reconciliation<E> {
  pub fn is_empty(&self) -> bool {
    self.to_add.is_empty() && self.to_remove.is_empty() && self.to_update.is_empty()
  }
}

/// Compute the minimal set of operations that transitions `previous` to
/// `incoming`.
///
/// - ids only in `incoming` are added, in `incoming` order;
/// - ids only in `previous` are removed, in `previous` order;
/// - ids in both are updated when their appearance differs, in `incoming`
///   order.
pub fn reconcile<E: Entity>(
  previous: &EntitySet<E>,
  incoming: &EntitySet<E>,
) -> Reconciliation<E> {
  let mut to_add = Vec::new();
  let mut to_update = Vec::new();

  for entity in incoming {
    match previous.get(entity.identifier()) {
      None => to_add.push(entity.clone()),
      Some(old) if !old.same_appearance(entity) => to_update.push(entity.clone()),
      Some(_) => {}
    }
  }

  let to_remove = previous
    .ids()
    .filter(|id| !incoming.contains(id))
    .map(str::to_string)
    .collect();

  Reconciliation {
    to_add,
    to_remove,
    to_update,
  }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
