/*
 * Copyright (c) Meta Platforms, Inc. and affiliates.
 * All rights reserved.
 *
 * This source code is licensed under the BSD-style license found in the
 * LICENSE file in the root directory of this source tree.
 */

//! Interned dimension labels.
//!
//! A [`Dim`] is a small `Copy` handle naming an array axis. Labels
//! are interned in a process-wide table the first time they are
//! seen, so comparing two labels is an integer comparison and the
//! name can always be recovered with [`Dim::name`].
//!
//! Identity across arrays is by name only: two arrays that both carry
//! a `Dim::new("x")` axis are aligned along that axis no matter where
//! it appears in their dimension lists.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::LazyLock;

use parking_lot::RwLock;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;

#[derive(Default)]
struct Interner {
    names: Vec<Arc<str>>,
    ids: HashMap<Arc<str>, u32>,
}

static INTERNER: LazyLock<RwLock<Interner>> = LazyLock::new(|| RwLock::new(Interner::default()));

/// An interned dimension label.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
pub struct Dim(u32);

impl Dim {
    /// Intern `label`, returning its handle. Interning the same label
    /// twice returns the same handle.
    pub fn new(label: &str) -> Self {
        if let Some(id) = INTERNER.read().ids.get(label) {
            return Dim(*id);
        }
        let mut interner = INTERNER.write();
        // Another caller may have raced us between the two locks.
        if let Some(id) = interner.ids.get(label) {
            return Dim(*id);
        }
        let id = interner.names.len() as u32;
        let name: Arc<str> = Arc::from(label);
        interner.names.push(name.clone());
        interner.ids.insert(name, id);
        Dim(id)
    }

    /// The label this handle was interned from.
    pub fn name(&self) -> Arc<str> {
        INTERNER.read().names[self.0 as usize].clone()
    }
}

impl From<&str> for Dim {
    fn from(label: &str) -> Self {
        Dim::new(label)
    }
}

impl From<&String> for Dim {
    fn from(label: &String) -> Self {
        Dim::new(label)
    }
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl fmt::Debug for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dim({:?})", &*self.name())
    }
}

impl Serialize for Dim {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}

impl<'de> Deserialize<'de> for Dim {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Ok(Dim::new(&label))
    }
}
