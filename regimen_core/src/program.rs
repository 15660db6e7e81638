//! Program structure: Program → Session Template → Exercise Block → Block Item.
//!
//! Each level owns its children in an ordered `Vec` with a 1-based,
//! contiguous `order_index`. Plans never point at results.

use crate::prescription::Prescription;
use crate::{
    BlockItemId, BlockType, Error, ExerciseBlockId, ExerciseId, ProgramId, Result,
    SessionTemplateId,
};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ============================================================================
// Ordering
// ============================================================================

/// A child entity positioned by `order_index` inside its parent
pub trait Sequenced {
    type Id: Copy + Eq + std::hash::Hash + std::fmt::Display;

    fn seq_id(&self) -> Self::Id;
    fn order_index(&self) -> u32;
    fn set_order_index(&mut self, index: u32);
}

/// Assign 1..=n in current vector order
pub fn renumber<T: Sequenced>(children: &mut [T]) {
    for (i, child) in children.iter_mut().enumerate() {
        child.set_order_index(i as u32 + 1);
    }
}

/// Rearrange children to match `order`, which must be a permutation of
/// the current child ids
pub fn reorder<T: Sequenced>(children: &mut Vec<T>, order: &[T::Id], what: &str) -> Result<()> {
    let current: HashSet<T::Id> = children.iter().map(|c| c.seq_id()).collect();
    let requested: HashSet<T::Id> = order.iter().copied().collect();
    if order.len() != children.len() || requested.len() != order.len() || current != requested {
        return Err(Error::InvalidState(format!(
            "reorder of {} must list each of the {} existing ids exactly once",
            what,
            children.len()
        )));
    }

    let mut remaining = std::mem::take(children);
    for id in order {
        if let Some(pos) = remaining.iter().position(|c| c.seq_id() == *id) {
            children.push(remaining.swap_remove(pos));
        }
    }
    renumber(children);
    Ok(())
}

/// Order indexes must read 1, 2, ..., n in vector order
pub fn check_contiguous<T: Sequenced>(children: &[T], what: &str) -> Result<()> {
    for (i, child) in children.iter().enumerate() {
        let expected = i as u32 + 1;
        if child.order_index() != expected {
            return Err(Error::InvalidState(format!(
                "{} {} has order index {}, expected {}",
                what,
                child.seq_id(),
                child.order_index(),
                expected
            )));
        }
    }
    Ok(())
}

macro_rules! sequenced {
    ($ty:ty, $id:ty) => {
        impl Sequenced for $ty {
            type Id = $id;

            fn seq_id(&self) -> $id {
                self.id
            }

            fn order_index(&self) -> u32 {
                self.order_index
            }

            fn set_order_index(&mut self, index: u32) {
                self.order_index = index;
            }
        }
    };
}

// ============================================================================
// Block Item
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct BlockItem {
    pub id: BlockItemId,
    pub order_index: u32,
    pub exercise_id: ExerciseId,
    pub prescription: Prescription,
    #[serde(default)]
    pub notes: Option<String>,
}

impl BlockItem {
    pub fn new(exercise_id: ExerciseId, prescription: Prescription) -> Self {
        Self {
            id: BlockItemId::new(),
            order_index: 0,
            exercise_id,
            prescription,
            notes: None,
        }
    }
}

sequenced!(BlockItem, BlockItemId);

// ============================================================================
// Exercise Block
// ============================================================================

/// Timing parameters; which ones matter depends on the block type
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BlockTiming {
    pub block_duration_seconds: Option<u32>,
    pub rest_between_items_seconds: Option<u32>,
    pub rest_after_block_seconds: Option<u32>,
    pub total_rounds: Option<u32>,
    pub interval_seconds: Option<u32>,
    pub work_phase_seconds: Option<u32>,
    pub rest_phase_seconds: Option<u32>,
    pub amrap_duration_seconds: Option<u32>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ExerciseBlock {
    pub id: ExerciseBlockId,
    pub label: String,
    pub order_index: u32,
    pub block_type: BlockType,
    #[serde(default)]
    pub timing: BlockTiming,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<BlockItem>,
}

impl ExerciseBlock {
    pub fn new(label: impl Into<String>, block_type: BlockType) -> Self {
        let mut timing = BlockTiming::default();
        if block_type == BlockType::Tabata {
            timing.work_phase_seconds = Some(20);
            timing.rest_phase_seconds = Some(10);
        }
        Self {
            id: ExerciseBlockId::new(),
            label: label.into(),
            order_index: 0,
            block_type,
            timing,
            instructions: None,
            notes: None,
            items: Vec::new(),
        }
    }

    pub fn superset(label: impl Into<String>) -> Self {
        Self::new(label, BlockType::Superset)
    }

    pub fn circuit(label: impl Into<String>, rounds: u32, rest_between_seconds: u32) -> Self {
        let mut block = Self::new(label, BlockType::Circuit);
        block.timing.total_rounds = Some(rounds);
        block.timing.rest_between_items_seconds = Some(rest_between_seconds);
        block
    }

    pub fn emom(label: impl Into<String>, interval_seconds: u32, total_seconds: u32) -> Self {
        let mut block = Self::new(label, BlockType::Emom);
        block.timing.interval_seconds = Some(interval_seconds);
        block.timing.block_duration_seconds = Some(total_seconds);
        block
    }

    pub fn tabata(label: impl Into<String>, rounds: u32) -> Self {
        let mut block = Self::new(label, BlockType::Tabata);
        block.timing.total_rounds = Some(rounds);
        block.timing.block_duration_seconds = Some(rounds * 30);
        block
    }

    pub fn amrap(label: impl Into<String>, duration_seconds: u32) -> Self {
        let mut block = Self::new(label, BlockType::Amrap);
        block.timing.amrap_duration_seconds = Some(duration_seconds);
        block.timing.block_duration_seconds = Some(duration_seconds);
        block
    }

    pub fn find_item(&self, id: BlockItemId) -> Option<&BlockItem> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn find_item_mut(&mut self, id: BlockItemId) -> Option<&mut BlockItem> {
        self.items.iter_mut().find(|i| i.id == id)
    }

    pub fn push_item(&mut self, mut item: BlockItem) {
        item.order_index = self.items.len() as u32 + 1;
        self.items.push(item);
    }
}

sequenced!(ExerciseBlock, ExerciseBlockId);

// ============================================================================
// Session Template
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionTemplate {
    pub id: SessionTemplateId,
    pub title: String,
    pub order_index: u32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub blocks: Vec<ExerciseBlock>,
}

impl SessionTemplate {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: SessionTemplateId::new(),
            title: title.into(),
            order_index: 0,
            description: None,
            blocks: Vec::new(),
        }
    }

    pub fn find_block(&self, id: ExerciseBlockId) -> Option<&ExerciseBlock> {
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn find_block_mut(&mut self, id: ExerciseBlockId) -> Option<&mut ExerciseBlock> {
        self.blocks.iter_mut().find(|b| b.id == id)
    }

    pub fn find_block_by_label(&self, label: &str) -> Option<&ExerciseBlock> {
        self.blocks.iter().find(|b| b.label == label)
    }

    pub fn has_label(&self, label: &str) -> bool {
        self.find_block_by_label(label).is_some()
    }

    /// Find an item anywhere in this session together with its block
    pub fn find_item(&self, id: BlockItemId) -> Option<(&ExerciseBlock, &BlockItem)> {
        self.blocks
            .iter()
            .find_map(|b| b.find_item(id).map(|item| (b, item)))
    }

    pub fn push_block(&mut self, mut block: ExerciseBlock) -> Result<()> {
        if self.has_label(&block.label) {
            return Err(Error::Validation(format!(
                "block label '{}' already used in session '{}'",
                block.label, self.title
            )));
        }
        block.order_index = self.blocks.len() as u32 + 1;
        self.blocks.push(block);
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        check_contiguous(&self.blocks, "block")?;
        let mut labels = HashSet::new();
        for block in &self.blocks {
            if !labels.insert(block.label.as_str()) {
                return Err(Error::Validation(format!(
                    "block label '{}' is not unique in session '{}'",
                    block.label, self.title
                )));
            }
            check_contiguous(&block.items, "block item")?;
            for item in &block.items {
                item.prescription.validate()?;
            }
        }
        Ok(())
    }
}

sequenced!(SessionTemplate, SessionTemplateId);

// ============================================================================
// Program
// ============================================================================

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Program {
    pub id: ProgramId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub total_weeks: u32,
    #[serde(default)]
    pub sessions: Vec<SessionTemplate>,
}

impl Program {
    pub fn new(title: impl Into<String>, total_weeks: u32) -> Self {
        Self {
            id: ProgramId::new(),
            title: title.into(),
            description: None,
            start_date: None,
            end_date: None,
            total_weeks,
            sessions: Vec::new(),
        }
    }

    /// Set the start date and derive the end from `total_weeks`
    pub fn start(&mut self, date: NaiveDate) {
        self.start_date = Some(date);
        if self.total_weeks > 0 {
            self.end_date = Some(date + Duration::weeks(i64::from(self.total_weeks)));
        }
    }

    /// Active when `date` falls inside the bounds; missing bounds are open
    pub fn is_active_on(&self, date: NaiveDate) -> bool {
        self.start_date.map_or(true, |s| s <= date) && self.end_date.map_or(true, |e| date <= e)
    }

    pub fn find_session(&self, id: SessionTemplateId) -> Option<&SessionTemplate> {
        self.sessions.iter().find(|s| s.id == id)
    }

    pub fn find_session_mut(&mut self, id: SessionTemplateId) -> Option<&mut SessionTemplate> {
        self.sessions.iter_mut().find(|s| s.id == id)
    }

    pub fn find_block(&self, id: ExerciseBlockId) -> Option<(&SessionTemplate, &ExerciseBlock)> {
        self.sessions
            .iter()
            .find_map(|s| s.find_block(id).map(|b| (s, b)))
    }

    /// Mutable access to the session owning a block
    pub fn session_of_block_mut(&mut self, id: ExerciseBlockId) -> Option<&mut SessionTemplate> {
        self.sessions
            .iter_mut()
            .find(|s| s.find_block(id).is_some())
    }

    pub fn find_item(
        &self,
        id: BlockItemId,
    ) -> Option<(&SessionTemplate, &ExerciseBlock, &BlockItem)> {
        self.sessions
            .iter()
            .find_map(|s| s.find_item(id).map(|(b, i)| (s, b, i)))
    }

    pub fn block_of_item_mut(&mut self, id: BlockItemId) -> Option<&mut ExerciseBlock> {
        self.sessions
            .iter_mut()
            .flat_map(|s| s.blocks.iter_mut())
            .find(|b| b.find_item(id).is_some())
    }

    pub fn push_session(&mut self, mut session: SessionTemplate) {
        session.order_index = self.sessions.len() as u32 + 1;
        self.sessions.push(session);
    }

    /// Whole-tree structural check run before every write
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("program title must not be empty".into()));
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if end < start {
                return Err(Error::Validation(format!(
                    "program end date {} is before start date {}",
                    end, start
                )));
            }
        }
        check_contiguous(&self.sessions, "session template")?;
        for session in &self.sessions {
            session.validate()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prescription::SimplePrescription;

    fn item() -> BlockItem {
        BlockItem::new(
            ExerciseId::new(),
            Prescription::Simple(SimplePrescription::new(3, 10)),
        )
    }

    #[test]
    fn test_start_sets_end_from_weeks() {
        let mut program = Program::new("Base", 4);
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        program.start(start);
        assert_eq!(program.end_date, NaiveDate::from_ymd_opt(2024, 1, 29));
        assert!(program.is_active_on(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()));
        assert!(!program.is_active_on(NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()));
    }

    #[test]
    fn test_end_before_start_is_rejected() {
        let mut program = Program::new("Base", 0);
        program.start_date = NaiveDate::from_ymd_opt(2024, 3, 1);
        program.end_date = NaiveDate::from_ymd_opt(2024, 2, 1);
        assert!(program.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_push_assigns_contiguous_indexes() {
        let mut block = ExerciseBlock::superset("A");
        block.push_item(item());
        block.push_item(item());
        let indexes: Vec<u32> = block.items.iter().map(|i| i.order_index).collect();
        assert_eq!(indexes, vec![1, 2]);
        assert!(check_contiguous(&block.items, "item").is_ok());

        block.items[1].order_index = 5;
        assert!(check_contiguous(&block.items, "item")
            .unwrap_err()
            .is_invalid_state());
    }

    #[test]
    fn test_reorder_requires_permutation() {
        let mut block = ExerciseBlock::circuit("C", 3, 30);
        for _ in 0..3 {
            block.push_item(item());
        }
        let ids: Vec<BlockItemId> = block.items.iter().map(|i| i.id).collect();

        let err = reorder(&mut block.items, &[ids[0], ids[1]], "block items").unwrap_err();
        assert!(err.is_invalid_state());
        let err = reorder(&mut block.items, &[ids[0], ids[0], ids[1]], "block items").unwrap_err();
        assert!(err.is_invalid_state());

        reorder(&mut block.items, &[ids[2], ids[0], ids[1]], "block items").unwrap();
        assert_eq!(block.items[0].id, ids[2]);
        assert_eq!(block.items[0].order_index, 1);
        assert_eq!(block.items[2].id, ids[1]);
        assert_eq!(block.items[2].order_index, 3);
    }

    #[test]
    fn test_duplicate_block_label_rejected() {
        let mut session = SessionTemplate::new("Day 1");
        session.push_block(ExerciseBlock::superset("A")).unwrap();
        let err = session.push_block(ExerciseBlock::tabata("A", 8)).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_block_factories() {
        let tabata = ExerciseBlock::tabata("T", 8);
        assert_eq!(tabata.timing.block_duration_seconds, Some(240));
        assert_eq!(tabata.timing.work_phase_seconds, Some(20));
        assert_eq!(tabata.timing.rest_phase_seconds, Some(10));

        let emom = ExerciseBlock::emom("E", 60, 720);
        assert_eq!(emom.timing.interval_seconds, Some(60));
        assert_eq!(emom.timing.block_duration_seconds, Some(720));

        let amrap = ExerciseBlock::amrap("M", 600);
        assert_eq!(amrap.timing.amrap_duration_seconds, Some(600));
    }

    #[test]
    fn test_find_item_walks_tree() {
        let mut program = Program::new("P", 0);
        let mut session = SessionTemplate::new("S");
        let mut block = ExerciseBlock::superset("A");
        let it = item();
        let item_id = it.id;
        block.push_item(it);
        let block_id = block.id;
        session.push_block(block).unwrap();
        program.push_session(session);

        let (s, b, i) = program.find_item(item_id).unwrap();
        assert_eq!(s.title, "S");
        assert_eq!(b.id, block_id);
        assert_eq!(i.order_index, 1);
        assert!(program.validate().is_ok());
    }
}
