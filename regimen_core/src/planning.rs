//! Planning operations over the program tree.
//!
//! Every mutation is a single `Repository::update_program` pass: the
//! closure edits a copy of the owning program, and the store validates the
//! whole tree before anything is written. Exercise references are resolved
//! before the pass starts, so the store is never re-entered from inside it.

use crate::catalog::{ExerciseCatalog, ExerciseRef, MissingExercisePolicy};
use crate::config::PlanningConfig;
use crate::prescription::Prescription;
use crate::program::{renumber, reorder, BlockItem, BlockTiming, ExerciseBlock, Program, SessionTemplate};
use crate::store::Repository;
use crate::{BlockItemId, BlockType, Error, ExerciseBlockId, ProgramId, Result, SessionTemplateId};
use chrono::NaiveDate;
use std::sync::Arc;

/// Scalar program fields to replace; `None` keeps the current value
#[derive(Clone, Debug, Default)]
pub struct ProgramChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub total_weeks: Option<u32>,
    pub start_date: Option<Option<NaiveDate>>,
    pub end_date: Option<Option<NaiveDate>>,
}

#[derive(Clone, Debug, Default)]
pub struct SessionChanges {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
}

#[derive(Clone, Debug, Default)]
pub struct BlockChanges {
    pub label: Option<String>,
    pub block_type: Option<BlockType>,
    pub timing: Option<BlockTiming>,
    pub instructions: Option<Option<String>>,
    pub notes: Option<Option<String>>,
}

#[derive(Clone, Debug, Default)]
pub struct ItemChanges {
    pub exercise: Option<ExerciseRef>,
    pub prescription: Option<Prescription>,
    pub notes: Option<Option<String>>,
}

/// Resolved location of a block item
#[derive(Clone, Debug, PartialEq)]
pub struct ItemLocation {
    pub program_id: ProgramId,
    pub session_id: SessionTemplateId,
    pub block: ExerciseBlock,
    pub item: BlockItem,
}

#[derive(Clone)]
pub struct PlanningService {
    repo: Arc<dyn Repository>,
    catalog: ExerciseCatalog,
}

impl PlanningService {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self {
            catalog: ExerciseCatalog::new(Arc::clone(&repo)),
            repo,
        }
    }

    pub fn from_config(repo: Arc<dyn Repository>, config: &PlanningConfig) -> Self {
        let service = Self::new(repo);
        let catalog = service
            .catalog
            .clone()
            .with_policy(config.missing_exercise)
            .with_stub_category(config.stub_category);
        Self { catalog, ..service }
    }

    /// Per-caller override of the missing-exercise policy
    pub fn with_policy(mut self, policy: MissingExercisePolicy) -> Self {
        self.catalog = self.catalog.with_policy(policy);
        self
    }

    pub fn catalog(&self) -> &ExerciseCatalog {
        &self.catalog
    }

    // ========================================================================
    // Programs
    // ========================================================================

    pub fn create_program(&self, title: &str, total_weeks: u32) -> Result<Program> {
        let program = Program::new(title.trim(), total_weeks);
        self.repo.save_program(&program)?;
        tracing::info!("Created program '{}' ({})", program.title, program.id);
        Ok(program)
    }

    pub fn get_program(&self, id: ProgramId) -> Result<Program> {
        self.repo.get_program(id)
    }

    pub fn list_programs(&self) -> Result<Vec<Program>> {
        self.repo.list_programs()
    }

    /// Case-insensitive title substring search
    pub fn search_programs(&self, title: &str) -> Result<Vec<Program>> {
        let needle = title.trim().to_lowercase();
        Ok(self
            .repo
            .list_programs()?
            .into_iter()
            .filter(|p| p.title.to_lowercase().contains(&needle))
            .collect())
    }

    pub fn find_active_programs(&self, date: NaiveDate) -> Result<Vec<Program>> {
        Ok(self
            .repo
            .list_programs()?
            .into_iter()
            .filter(|p| p.is_active_on(date))
            .collect())
    }

    pub fn update_program(&self, id: ProgramId, changes: ProgramChanges) -> Result<Program> {
        self.repo.update_program(id, &mut |program| {
            let changes = changes.clone();
            if let Some(title) = changes.title {
                program.title = title;
            }
            if let Some(description) = changes.description {
                program.description = description;
            }
            if let Some(weeks) = changes.total_weeks {
                program.total_weeks = weeks;
            }
            if let Some(start) = changes.start_date {
                program.start_date = start;
            }
            if let Some(end) = changes.end_date {
                program.end_date = end;
            }
            Ok(())
        })
    }

    pub fn start_program(&self, id: ProgramId, date: NaiveDate) -> Result<Program> {
        let program = self.repo.update_program(id, &mut |program| {
            program.start(date);
            Ok(())
        })?;
        tracing::info!("Started program '{}' on {}", program.title, date);
        Ok(program)
    }

    /// Drops every owned session, block and item
    pub fn delete_program(&self, id: ProgramId) -> Result<()> {
        if !self.repo.delete_program(id)? {
            return Err(Error::not_found("program", id));
        }
        tracing::info!("Deleted program {}", id);
        Ok(())
    }

    // ========================================================================
    // Session Templates
    // ========================================================================

    pub fn add_session_template(
        &self,
        program_id: ProgramId,
        title: &str,
        description: Option<String>,
    ) -> Result<SessionTemplate> {
        let mut session = SessionTemplate::new(title.trim());
        session.description = description;
        let session_id = session.id;

        let program = self.repo.update_program(program_id, &mut |program| {
            program.push_session(session.clone());
            Ok(())
        })?;
        let session = program
            .find_session(session_id)
            .cloned()
            .ok_or_else(|| Error::not_found("session template", session_id))?;
        tracing::info!(
            "Added session '{}' at position {} to program {}",
            session.title,
            session.order_index,
            program_id
        );
        Ok(session)
    }

    pub fn find_session_template(&self, id: SessionTemplateId) -> Result<SessionTemplate> {
        Ok(self.repo.get_session_template(id)?.1)
    }

    pub fn update_session_template(
        &self,
        id: SessionTemplateId,
        changes: SessionChanges,
    ) -> Result<SessionTemplate> {
        let (program_id, _) = self.repo.get_session_template(id)?;
        let program = self.repo.update_program(program_id, &mut |program| {
            let changes = changes.clone();
            let session = program
                .find_session_mut(id)
                .ok_or_else(|| Error::not_found("session template", id))?;
            if let Some(title) = changes.title {
                session.title = title;
            }
            if let Some(description) = changes.description {
                session.description = description;
            }
            Ok(())
        })?;
        program
            .find_session(id)
            .cloned()
            .ok_or_else(|| Error::not_found("session template", id))
    }

    pub fn remove_session_template(&self, id: SessionTemplateId) -> Result<()> {
        let (program_id, _) = self.repo.get_session_template(id)?;
        self.repo.update_program(program_id, &mut |program| {
            program.sessions.retain(|s| s.id != id);
            renumber(&mut program.sessions);
            Ok(())
        })?;
        tracing::info!("Removed session template {} from program {}", id, program_id);
        Ok(())
    }

    pub fn reorder_session_templates(
        &self,
        program_id: ProgramId,
        order: &[SessionTemplateId],
    ) -> Result<Program> {
        self.repo.update_program(program_id, &mut |program| {
            reorder(&mut program.sessions, order, "session templates")
        })
    }

    // ========================================================================
    // Blocks
    // ========================================================================

    /// Append a block; its label must be unique within the session
    pub fn add_block(&self, session_id: SessionTemplateId, block: ExerciseBlock) -> Result<ExerciseBlock> {
        let (program_id, _) = self.repo.get_session_template(session_id)?;
        let block_id = block.id;

        let program = self.repo.update_program(program_id, &mut |program| {
            let session = program
                .find_session_mut(session_id)
                .ok_or_else(|| Error::not_found("session template", session_id))?;
            session.push_block(block.clone())
        })?;
        let (_, block) = program
            .find_block(block_id)
            .ok_or_else(|| Error::not_found("exercise block", block_id))?;
        tracing::info!(
            "Added {} block '{}' to session {}",
            block.block_type,
            block.label,
            session_id
        );
        Ok(block.clone())
    }

    pub fn find_block(&self, id: ExerciseBlockId) -> Result<(SessionTemplateId, ExerciseBlock)> {
        for program in self.repo.list_programs()? {
            if let Some((session, block)) = program.find_block(id) {
                return Ok((session.id, block.clone()));
            }
        }
        Err(Error::not_found("exercise block", id))
    }

    pub fn update_block(&self, id: ExerciseBlockId, changes: BlockChanges) -> Result<ExerciseBlock> {
        let program_id = self.program_of_block(id)?;
        let program = self.repo.update_program(program_id, &mut |program| {
            let changes = changes.clone();
            let block = program
                .session_of_block_mut(id)
                .and_then(|s| s.find_block_mut(id))
                .ok_or_else(|| Error::not_found("exercise block", id))?;
            if let Some(label) = changes.label {
                block.label = label;
            }
            if let Some(block_type) = changes.block_type {
                block.block_type = block_type;
            }
            if let Some(timing) = changes.timing {
                block.timing = timing;
            }
            if let Some(instructions) = changes.instructions {
                block.instructions = instructions;
            }
            if let Some(notes) = changes.notes {
                block.notes = notes;
            }
            Ok(())
        })?;
        program
            .find_block(id)
            .map(|(_, b)| b.clone())
            .ok_or_else(|| Error::not_found("exercise block", id))
    }

    pub fn remove_block(&self, id: ExerciseBlockId) -> Result<()> {
        let program_id = self.program_of_block(id)?;
        self.repo.update_program(program_id, &mut |program| {
            let session = program
                .session_of_block_mut(id)
                .ok_or_else(|| Error::not_found("exercise block", id))?;
            session.blocks.retain(|b| b.id != id);
            renumber(&mut session.blocks);
            Ok(())
        })?;
        tracing::info!("Removed block {}", id);
        Ok(())
    }

    pub fn reorder_blocks(
        &self,
        session_id: SessionTemplateId,
        order: &[ExerciseBlockId],
    ) -> Result<SessionTemplate> {
        let (program_id, _) = self.repo.get_session_template(session_id)?;
        let program = self.repo.update_program(program_id, &mut |program| {
            let session = program
                .find_session_mut(session_id)
                .ok_or_else(|| Error::not_found("session template", session_id))?;
            reorder(&mut session.blocks, order, "blocks")
        })?;
        program
            .find_session(session_id)
            .cloned()
            .ok_or_else(|| Error::not_found("session template", session_id))
    }

    // ========================================================================
    // Block Items
    // ========================================================================

    /// Append an item; the exercise is resolved under the catalog policy
    pub fn add_block_item(
        &self,
        block_id: ExerciseBlockId,
        exercise: &ExerciseRef,
        prescription: Prescription,
    ) -> Result<BlockItem> {
        prescription.validate()?;
        let program_id = self.program_of_block(block_id)?;
        let exercise = self.catalog.resolve(exercise)?;
        let item = BlockItem::new(exercise.id, prescription);
        let item_id = item.id;

        let program = self.repo.update_program(program_id, &mut |program| {
            let block = program
                .session_of_block_mut(block_id)
                .and_then(|s| s.find_block_mut(block_id))
                .ok_or_else(|| Error::not_found("exercise block", block_id))?;
            block.push_item(item.clone());
            Ok(())
        })?;
        let (_, _, item) = program
            .find_item(item_id)
            .ok_or_else(|| Error::not_found("block item", item_id))?;
        tracing::info!(
            "Added '{}' ({}) to block {}",
            exercise.name,
            item.prescription.summary(),
            block_id
        );
        Ok(item.clone())
    }

    pub fn find_block_item(&self, id: BlockItemId) -> Result<ItemLocation> {
        for program in self.repo.list_programs()? {
            if let Some((session, block, item)) = program.find_item(id) {
                return Ok(ItemLocation {
                    program_id: program.id,
                    session_id: session.id,
                    block: block.clone(),
                    item: item.clone(),
                });
            }
        }
        Err(Error::not_found("block item", id))
    }

    pub fn update_block_item(&self, id: BlockItemId, changes: ItemChanges) -> Result<BlockItem> {
        let location = self.find_block_item(id)?;
        if let Some(prescription) = &changes.prescription {
            prescription.validate()?;
        }
        let exercise_id = match &changes.exercise {
            Some(reference) => Some(self.catalog.resolve(reference)?.id),
            None => None,
        };

        let program = self.repo.update_program(location.program_id, &mut |program| {
            let item = program
                .block_of_item_mut(id)
                .and_then(|b| b.find_item_mut(id))
                .ok_or_else(|| Error::not_found("block item", id))?;
            if let Some(exercise_id) = exercise_id {
                item.exercise_id = exercise_id;
            }
            if let Some(prescription) = &changes.prescription {
                item.prescription = prescription.clone();
            }
            if let Some(notes) = &changes.notes {
                item.notes = notes.clone();
            }
            Ok(())
        })?;
        program
            .find_item(id)
            .map(|(_, _, i)| i.clone())
            .ok_or_else(|| Error::not_found("block item", id))
    }

    pub fn update_prescription(&self, id: BlockItemId, prescription: Prescription) -> Result<BlockItem> {
        self.update_block_item(
            id,
            ItemChanges {
                prescription: Some(prescription),
                ..ItemChanges::default()
            },
        )
    }

    pub fn remove_block_item(&self, id: BlockItemId) -> Result<()> {
        let location = self.find_block_item(id)?;
        self.repo.update_program(location.program_id, &mut |program| {
            let block = program
                .block_of_item_mut(id)
                .ok_or_else(|| Error::not_found("block item", id))?;
            block.items.retain(|i| i.id != id);
            renumber(&mut block.items);
            Ok(())
        })?;
        tracing::info!("Removed block item {}", id);
        Ok(())
    }

    pub fn reorder_block_items(
        &self,
        block_id: ExerciseBlockId,
        order: &[BlockItemId],
    ) -> Result<ExerciseBlock> {
        let program_id = self.program_of_block(block_id)?;
        let program = self.repo.update_program(program_id, &mut |program| {
            let block = program
                .session_of_block_mut(block_id)
                .and_then(|s| s.find_block_mut(block_id))
                .ok_or_else(|| Error::not_found("exercise block", block_id))?;
            reorder(&mut block.items, order, "block items")
        })?;
        program
            .find_block(block_id)
            .map(|(_, b)| b.clone())
            .ok_or_else(|| Error::not_found("exercise block", block_id))
    }

    fn program_of_block(&self, id: ExerciseBlockId) -> Result<ProgramId> {
        self.repo
            .list_programs()?
            .into_iter()
            .find(|p| p.find_block(id).is_some())
            .map(|p| p.id)
            .ok_or_else(|| Error::not_found("exercise block", id))
    }
}
