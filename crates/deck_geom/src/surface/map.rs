//! The id-keyed surface registry.
//!
//! Forward surfaces live under positive ids, their reversed instances
//! under the negated id. Registration allocates ids sequentially and
//! is serialized behind one mutex; FILL workers registering transformed
//! surfaces concurrently contend on that lock only.

use std::collections::BTreeMap;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use regex::Regex;

use crate::error::{Error, Result};
use crate::math::{Affine, Point};
use crate::surface::Surface;
use crate::transform;

struct MapInner {
  front: BTreeMap<i32, Arc<Surface>>,
  back: BTreeMap<i32, Arc<Surface>>,
  name_index: HashMap<String, i32>,
  next_id: i32,
}

/// Thread-safe registry of all surface instances of a resolution.
pub struct SurfaceMap {
  inner: Mutex<MapInner>,
}

impl Default for SurfaceMap {
  fn default() -> Self {
    SurfaceMap::new()
  }
}

impl SurfaceMap {
  pub fn new() -> SurfaceMap {
    SurfaceMap {
      inner: Mutex::new(MapInner {
        front: BTreeMap::new(),
        back: BTreeMap::new(),
        name_index: HashMap::new(),
        next_id: 1,
      }),
    }
  }

  /// Register a forward surface together with its generated reversed
  /// instance. Returns the allocated positive id.
  pub fn register(&self, mut surface: Surface) -> Result<i32> {
    let mut inner = self.inner.lock().unwrap();
    if inner.name_index.contains_key(surface.name()) {
      return Err(Error::DuplicateName(surface.name().to_string()));
    }
    let id = inner.next_id;
    surface.set_id(id);
    let reverse = surface.make_reverse()?;
    if inner.front.contains_key(&id) {
      return Err(Error::DuplicateId(id));
    }
    inner.next_id += 1;
    inner.name_index.insert(surface.name().to_string(), id);
    inner.name_index.insert(reverse.name().to_string(), -id);
    inner.front.insert(id, Arc::new(surface));
    inner.back.insert(-id, Arc::new(reverse));
    Ok(id)
  }

  pub fn has_name(&self, name: &str) -> bool {
    self.inner.lock().unwrap().name_index.contains_key(name)
  }

  /// Signed id of a registered surface name.
  pub fn id_of(&self, name: &str) -> Result<i32> {
    self
      .inner
      .lock()
      .unwrap()
      .name_index
      .get(name)
      .copied()
      .ok_or_else(|| Error::BadCard {
        file: String::new(),
        line: 0,
        what: format!("surface \"{name}\" not found in the surface map"),
      })
  }

  /// Surface instance by signed id; zero is forbidden.
  pub fn at(&self, id: i32) -> Result<Arc<Surface>> {
    if id == 0 {
      return Err(Error::DuplicateId(0));
    }
    let inner = self.inner.lock().unwrap();
    let slot = if id > 0 { inner.front.get(&id) } else { inner.back.get(&id) };
    slot.cloned().ok_or_else(|| Error::BadCard {
      file: String::new(),
      line: 0,
      what: format!("no surface registered under id {id}"),
    })
  }

  pub fn by_name(&self, name: &str) -> Result<Arc<Surface>> {
    let id = self.id_of(name)?;
    self.at(id)
  }

  /// Forward/back test through the stored sign convention.
  pub fn is_forward(&self, id: i32, point: Point) -> Result<bool> {
    Ok(self.at(id)?.is_forward(point))
  }

  /// Names and signed ids of every forward surface.
  pub fn front_entries(&self) -> Vec<(String, i32)> {
    let inner = self.inner.lock().unwrap();
    inner
      .front
      .values()
      .map(|s| (s.name().to_string(), s.id()))
      .collect()
  }

  pub fn front_surfaces(&self) -> Vec<Arc<Surface>> {
    self.inner.lock().unwrap().front.values().cloned().collect()
  }

  pub fn len(&self) -> usize {
    self.inner.lock().unwrap().front.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Drop surfaces whose names are not in `used`, along with their
  /// reversed twins.
  pub fn retain_named(&self, used: &std::collections::HashSet<String>) {
    let mut inner = self.inner.lock().unwrap();
    let dropped: Vec<(i32, String)> = inner
      .front
      .values()
      .filter(|s| !used.contains(s.name()))
      .map(|s| (s.id(), s.name().to_string()))
      .collect();
    for (id, name) in dropped {
      tracing::debug!(surface = %name, "dropping unused surface");
      inner.front.remove(&id);
      inner.back.remove(&(-id));
      inner.name_index.remove(&name);
      inner.name_index.remove(&format!("-{name}"));
    }
  }

  /// Deep-copy `old_name` under the deterministic TRCL-derived name,
  /// apply the composed transform, and register forward and reversed
  /// instances. Returns the new (unsigned) name. Re-registration of an
  /// existing name is a no-op.
  pub fn register_transformed(
    &self,
    tr_map: &HashMap<usize, Affine>,
    old_name: &str,
    tred_cell: &str,
    trcl_str: &str,
  ) -> Result<String> {
    let new_name = crate::input::card::transformed_surface_name(tred_cell, old_name);
    let unsigned = new_name.trim_start_matches(['-', '+']).to_string();
    if self.has_name(&unsigned) {
      return Ok(unsigned);
    }
    let matrix = transform::compose_transforms(tr_map, trcl_str)?;
    let source = self.by_name(old_name.trim_start_matches(['-', '+']))?;
    let mut fresh = source.deep_copy(unsigned.clone())?;
    fresh.transform(&matrix);
    match self.register(fresh) {
      Ok(_) => {}
      // Another worker registered the same combination between the
      // name check and here; theirs is identical.
      Err(Error::DuplicateName(_)) => {}
      Err(e) => return Err(e),
    }
    Ok(unsigned)
  }

  /// Substitute every surface name in a cell polynomial with its
  /// numeric id. Replacement goes through a `*id*` sentinel so freshly
  /// written digits can never be re-matched as part of a longer
  /// surface name.
  pub fn make_index_equation(&self, name_equation: &str) -> Result<String> {
    let name_pattern = surface_name_pattern();
    let mut replacements: Vec<(String, i32)> = Vec::new();
    for caps in name_pattern.captures_iter(name_equation) {
      let mut token = caps.get(2).map(|m| m.as_str()).unwrap_or("").to_string();
      if token.is_empty() {
        continue;
      }
      if let Some(stripped) = token.strip_prefix('+') {
        token = stripped.to_string();
      }
      if replacements.iter().any(|(n, _)| *n == token) {
        continue;
      }
      let lookup = token.trim_start_matches('-');
      let mut id = self.id_of(lookup)?;
      if token.starts_with('-') {
        id = -id;
      }
      replacements.push((token, id));
    }

    // Longest first so facet names like "B.1" are never shadowed by a
    // shorter name that happens to be their substring.
    replacements.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then(a.0.cmp(&b.0)));

    let mut equation = name_equation.to_string();
    for (name, id) in &replacements {
      let escaped = regex::escape(name);
      let pattern = Regex::new(&format!(r"([^0-9a-zA-Z*]|^)({escaped})([^0-9a-zA-Z*]|$)")).unwrap();
      let sentinel = format!("*{id}*");
      loop {
        let Some(caps) = pattern.captures(&equation) else {
          break;
        };
        let m = caps.get(2).unwrap();
        let mut next = String::with_capacity(equation.len());
        next.push_str(&equation[..m.start()]);
        next.push_str(&sentinel);
        next.push_str(&equation[m.end()..]);
        equation = next;
      }
    }
    Ok(equation.replace('*', ""))
  }
}

/// Pattern matching one (optionally sign-prefixed) surface name.
pub fn surface_name_pattern() -> &'static Regex {
  static PATTERN: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
  PATTERN.get_or_init(|| Regex::new(r"([-+*]*)([-+.,_@<\[\]\w]+)").unwrap())
}

#[cfg(test)]
#[path = "map_test.rs"]
mod map_test;
