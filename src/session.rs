//! Persistent editing session: the current frame, the pristine original it
//! was loaded from, the qualifier bookkeeping, and a one-level undo.
//!
//! Each CLI invocation loads the session file, applies a single operation,
//! and writes it back. Header merges are always recomputed from the
//! original frame so row and column drops survive header changes; drops are
//! mirrored into the original for the same reason.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::classify::{TypeRegistry, ValueKind, classify_frame};
use crate::frame::{Column, Frame};
use crate::qualifier::{QualifiedName, Qualifier, base_name};

const SESSION_VERSION: u32 = 1;

/// Reserved qualifiers tolerate this many repeat assignments before the
/// conflict is surfaced; repeats below the limit are treated as callback
/// echo and ignored.
const RESERVED_RETRY_LIMIT: u8 = 2;

/// Header merges may consume at most this many leading rows.
pub const MAX_HEADER_ROWS: usize = 4;

/// Edit failures surfaced to the user as inline messages. The table is
/// always left untouched when one of these comes back.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("{} can only be assigned to a single variable.", .0.suffix())]
    ReservedConflict(Qualifier),
    #[error("Unknown column '{0}'")]
    UnknownColumn(String),
    #[error("Column name '{0}' already exists")]
    DuplicateName(String),
    #[error("Second qualifier must be #hidden or #hiddenmore, got {}", .0.suffix())]
    InvalidCombination(Qualifier),
    #[error("Header rows must be between 1 and {}, got {}", MAX_HEADER_ROWS, .0)]
    HeaderRange(usize),
    #[error("Coordinate columns already exist.")]
    CoordinatesExist,
}

/// Category of the most recent change, exposed so an undo driver can tell
/// header reconfigurations apart from table edits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    #[default]
    None,
    Header,
    Axis,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::None => "none",
            ChangeKind::Header => "header",
            ChangeKind::Axis => "axis",
        }
    }
}

/// Reassign target: a vocabulary tag or the clear pseudo-qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignTarget {
    Clear,
    Tag(Qualifier),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct Snapshot {
    frame: Frame,
    original: Frame,
    registry: TypeRegistry,
    reserved: BTreeMap<Qualifier, u8>,
    header_rows: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorSession {
    version: u32,
    source: PathBuf,
    frame: Frame,
    original: Frame,
    registry: TypeRegistry,
    reserved: BTreeMap<Qualifier, u8>,
    snapshot: Option<Snapshot>,
    change: ChangeKind,
    header_rows: usize,
    header_history: Vec<usize>,
    skip_header_redetect: bool,
}

impl EditorSession {
    pub fn new(source: PathBuf, frame: Frame) -> Self {
        let original = frame.clone();
        EditorSession {
            version: SESSION_VERSION,
            source,
            frame,
            original,
            registry: TypeRegistry::default(),
            reserved: BTreeMap::new(),
            snapshot: None,
            change: ChangeKind::None,
            header_rows: 1,
            header_history: vec![1],
            skip_header_redetect: false,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn frame(&self) -> &Frame {
        &self.frame
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn last_change(&self) -> ChangeKind {
        self.change
    }

    pub fn header_rows(&self) -> usize {
        self.header_rows
    }

    /// Header-row counts in the order they were selected, the initial `1`
    /// included.
    pub fn header_history(&self) -> &[usize] {
        &self.header_history
    }

    pub fn reserved_count(&self, qualifier: Qualifier) -> u8 {
        self.reserved.get(&qualifier).copied().unwrap_or(0)
    }

    /// Run the inference pass over the current frame. A full pass resets the
    /// reserved ledger and discards the undo slot; a short-circuited pass
    /// only refreshes the registry. Returns whether a full pass ran.
    pub fn classify(&mut self) -> bool {
        let outcome = classify_frame(&mut self.frame);
        self.registry = outcome.registry;
        if !outcome.short_circuited {
            self.reserved.clear();
        }
        self.snapshot = None;
        self.change = ChangeKind::None;
        self.skip_header_redetect = false;
        !outcome.short_circuited
    }

    /// Apply a qualifier edit to the selected columns.
    ///
    /// `new_base` replaces the base name, and only applies when exactly one
    /// column is selected. Reserved qualifiers take a different path: the
    /// column is duplicated rather than renamed, and at most one column may
    /// ever receive the tag. An empty selection changes nothing.
    pub fn reassign(
        &mut self,
        columns: &[String],
        target: AssignTarget,
        second: Option<Qualifier>,
        new_base: Option<&str>,
    ) -> Result<(), EditError> {
        if columns.is_empty() {
            debug!("Reassign with no columns selected; nothing to do");
            return Ok(());
        }
        for name in columns {
            if self.frame.column_index(name).is_none() {
                return Err(EditError::UnknownColumn(name.clone()));
            }
        }
        match target {
            AssignTarget::Tag(qualifier) if qualifier.is_reserved() => {
                self.assign_reserved(columns, qualifier)
            }
            AssignTarget::Tag(qualifier) => self.retag(columns, Some(qualifier), second, new_base),
            AssignTarget::Clear => self.retag(columns, None, None, new_base),
        }
    }

    fn retag(
        &mut self,
        columns: &[String],
        tag: Option<Qualifier>,
        second: Option<Qualifier>,
        new_base: Option<&str>,
    ) -> Result<(), EditError> {
        if let Some(extra) = second
            && !matches!(extra, Qualifier::Hidden | Qualifier::HiddenMore)
        {
            return Err(EditError::InvalidCombination(extra));
        }
        let mut renames: Vec<(String, String)> = Vec::new();
        for name in columns {
            let base = match new_base {
                Some(replacement) if columns.len() == 1 && !replacement.trim().is_empty() => {
                    replacement.to_string()
                }
                _ => base_name(name).to_string(),
            };
            let mut updated = base;
            if let Some(tag) = tag {
                updated.push_str(tag.suffix());
                if let Some(extra) = second {
                    updated.push_str(extra.suffix());
                }
            }
            renames.push((name.clone(), updated));
        }
        self.ensure_unique_after(&renames)?;

        self.take_snapshot(ChangeKind::Axis);
        for (old, new) in &renames {
            if old == new {
                continue;
            }
            if let Some(index) = self.frame.column_index(old) {
                self.frame.columns[index].name = new.clone();
            }
            self.registry.rename(old, new);
            info!("Renamed column '{old}' to '{new}'");
        }
        Ok(())
    }

    fn assign_reserved(&mut self, columns: &[String], qualifier: Qualifier) -> Result<(), EditError> {
        if columns.len() > 1 {
            return Err(EditError::ReservedConflict(qualifier));
        }
        match self.reserved.get(&qualifier).copied() {
            Some(count) if count < RESERVED_RETRY_LIMIT => {
                self.reserved.insert(qualifier, count + 1);
                debug!(
                    "Ignoring repeat assignment of {} (attempt {})",
                    qualifier.suffix(),
                    count + 1
                );
                return Ok(());
            }
            Some(_) => return Err(EditError::ReservedConflict(qualifier)),
            None => {}
        }
        let source = &columns[0];
        let Some(index) = self.frame.column_index(source) else {
            return Err(EditError::UnknownColumn(source.clone()));
        };
        let duplicate_name = format!("{}{}", base_name(source), qualifier.suffix());
        if self.frame.column_index(&duplicate_name).is_some() {
            return Err(EditError::DuplicateName(duplicate_name));
        }

        self.take_snapshot(ChangeKind::Axis);
        let cells = self.frame.columns[index].cells.clone();
        let kind = self.registry.kind_of(source);
        self.frame
            .insert_column(index + 1, Column::new(duplicate_name.clone(), cells));
        if let Some(kind) = kind {
            self.registry.insert(duplicate_name.clone(), kind);
        }
        self.reserved.insert(qualifier, 1);
        info!("Assigned {} to '{source}' as '{duplicate_name}'", qualifier.suffix());
        Ok(())
    }

    /// Replace one column's base name, keeping its qualifier suffixes.
    pub fn rename(&mut self, column: &str, new_base: &str) -> Result<(), EditError> {
        let Some(index) = self.frame.column_index(column) else {
            return Err(EditError::UnknownColumn(column.to_string()));
        };
        let parsed = QualifiedName::parse(column);
        let renamed = QualifiedName {
            base: new_base.to_string(),
            qualifiers: parsed.qualifiers,
        }
        .render();
        if renamed == column {
            return Ok(());
        }
        if self.frame.column_index(&renamed).is_some() {
            return Err(EditError::DuplicateName(renamed));
        }
        self.take_snapshot(ChangeKind::Axis);
        self.frame.columns[index].name = renamed.clone();
        self.registry.rename(column, &renamed);
        info!("Renamed column '{column}' to '{renamed}'");
        Ok(())
    }

    /// Merge the first `rows - 1` data rows into the header, recomputed
    /// from the original frame. Re-selecting the current count is a no-op
    /// and consumes the post-undo suppression flag.
    pub fn set_header_rows(&mut self, rows: usize) -> Result<bool, EditError> {
        if !(1..=MAX_HEADER_ROWS).contains(&rows) {
            return Err(EditError::HeaderRange(rows));
        }
        if rows == self.header_rows {
            if self.skip_header_redetect {
                debug!("Header count re-selected after undo; no change");
            }
            self.skip_header_redetect = false;
            return Ok(false);
        }
        self.take_snapshot(ChangeKind::Header);
        self.header_rows = rows;
        self.header_history.push(rows);
        self.rebuild_headers();
        info!("Merged {rows} header row(s) into column names");
        Ok(true)
    }

    fn rebuild_headers(&mut self) {
        let merged = Frame::with_merged_headers(&self.original, self.header_rows);
        // Header names changed wholesale; only registry entries whose names
        // survive the merge stay meaningful.
        let mut registry = TypeRegistry::default();
        for column in &merged.columns {
            if let Some(kind) = self.registry.kind_of(&column.name) {
                registry.insert(column.name.clone(), kind);
            }
        }
        self.registry = registry;
        self.frame = merged;
    }

    /// Drop columns by name, mirroring the removal into the original frame
    /// so later header merges do not resurrect them.
    pub fn drop_columns(&mut self, names: &[String]) -> Result<(), EditError> {
        let mut indices = Vec::new();
        for name in names {
            match self.frame.column_index(name) {
                Some(index) => indices.push(index),
                None => return Err(EditError::UnknownColumn(name.clone())),
            }
        }
        if indices.is_empty() {
            return Ok(());
        }
        self.take_snapshot(ChangeKind::Axis);
        indices.sort_unstable();
        indices.dedup();
        for index in indices.into_iter().rev() {
            let mirror = self.original_column_index(index);
            let removed = self.frame.columns.remove(index);
            self.registry.remove(&removed.name);
            match mirror {
                Some(original_index) => self.original.drop_column_at(original_index),
                None => debug!("Column '{}' has no counterpart to mirror", removed.name),
            }
            info!("Dropped column '{}'", removed.name);
        }
        Ok(())
    }

    /// Original-frame position of the column at `index` in the current
    /// frame. Positions align one-to-one until a duplicate or enrichment
    /// column widens the frame; from then on the lookup falls back to the
    /// name and then the base name. Appended columns have no counterpart.
    fn original_column_index(&self, index: usize) -> Option<usize> {
        if self.frame.width() == self.original.width() {
            return Some(index);
        }
        let name = &self.frame.columns[index].name;
        self.original
            .column_index(name)
            .or_else(|| self.original.column_index(base_name(name)))
    }

    /// Drop rows by label (inclusive range; a single row is `label..=label`),
    /// mirrored into the original frame by the same labels. Bounds that are
    /// not labels of the current frame make the whole request a no-op,
    /// matching how the editor ignores invalid row selections.
    pub fn drop_rows(&mut self, lower: u64, upper: u64) -> bool {
        if lower > upper || !self.frame.has_label(lower) || !self.frame.has_label(upper) {
            debug!("Ignoring row drop {lower}..={upper}: bounds not present");
            return false;
        }
        self.take_snapshot(ChangeKind::Axis);
        self.frame.drop_label_range(lower, upper);
        self.original.drop_label_range(lower, upper);
        info!("Dropped row label(s) {lower}..={upper}");
        true
    }

    /// Append enrichment columns (geometry, coordinates) as one undoable
    /// change.
    pub fn append_columns(
        &mut self,
        additions: Vec<(Column, ValueKind)>,
    ) -> Result<(), EditError> {
        for (column, _) in &additions {
            if self.frame.column_index(&column.name).is_some() {
                return Err(EditError::DuplicateName(column.name.clone()));
            }
        }
        if additions.is_empty() {
            return Ok(());
        }
        self.take_snapshot(ChangeKind::Axis);
        for (column, kind) in additions {
            info!("Appended column '{}'", column.name);
            self.registry.insert(column.name.clone(), kind);
            self.frame.columns.push(column);
        }
        Ok(())
    }

    /// Append an image-identifier column, consuming the reserved `#img`
    /// slot.
    pub fn append_image_column(&mut self, column: Column) -> Result<(), EditError> {
        if self.reserved.contains_key(&Qualifier::Img) {
            return Err(EditError::ReservedConflict(Qualifier::Img));
        }
        if self.frame.column_index(&column.name).is_some() {
            return Err(EditError::DuplicateName(column.name));
        }
        self.take_snapshot(ChangeKind::Axis);
        info!("Appended image column '{}'", column.name);
        self.registry.insert(column.name.clone(), ValueKind::Textual);
        self.frame.columns.push(column);
        self.reserved.insert(Qualifier::Img, 1);
        Ok(())
    }

    /// Restore the state captured before the most recent change and report
    /// what was undone. Header undos additionally rewind the header-row
    /// count and arm the redetection suppression flag. With no snapshot
    /// this is a no-op.
    pub fn undo(&mut self) -> ChangeKind {
        let Some(snapshot) = self.snapshot.take() else {
            debug!("Nothing to undo");
            self.change = ChangeKind::None;
            return ChangeKind::None;
        };
        let undone = self.change;
        self.frame = snapshot.frame;
        self.original = snapshot.original;
        self.registry = snapshot.registry;
        self.reserved = snapshot.reserved;
        self.header_rows = snapshot.header_rows;
        if undone == ChangeKind::Header {
            self.header_history.push(snapshot.header_rows);
            self.skip_header_redetect = true;
            info!("Rewound header rows to {}", self.header_rows);
        } else {
            info!("Restored the state before the last change");
        }
        self.change = ChangeKind::None;
        undone
    }

    fn take_snapshot(&mut self, change: ChangeKind) {
        self.snapshot = Some(Snapshot {
            frame: self.frame.clone(),
            original: self.original.clone(),
            registry: self.registry.clone(),
            reserved: self.reserved.clone(),
            header_rows: self.header_rows,
        });
        self.change = change;
        self.skip_header_redetect = false;
    }

    fn ensure_unique_after(&self, renames: &[(String, String)]) -> Result<(), EditError> {
        let mut names: Vec<String> = Vec::with_capacity(self.frame.width());
        for column in &self.frame.columns {
            let name = renames
                .iter()
                .find(|(old, _)| *old == column.name)
                .map(|(_, new)| new.clone())
                .unwrap_or_else(|| column.name.clone());
            if names.contains(&name) {
                return Err(EditError::DuplicateName(name));
            }
            names.push(name);
        }
        Ok(())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let bytes = bincode::serde::encode_to_vec(self, bincode::config::standard())
            .context("Serializing session")?;
        fs::write(path, bytes).with_context(|| format!("Writing session to {path:?}"))?;
        debug!("Session saved to {path:?}");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("Reading session from {path:?}"))?;
        let (session, _): (EditorSession, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard())
                .with_context(|| format!("Decoding session from {path:?}"))?;
        if session.version != SESSION_VERSION {
            bail!(
                "Session file {path:?} has version {} but this build expects {SESSION_VERSION}",
                session.version
            );
        }
        Ok(session)
    }
}
