//! Exercise catalog and the create-or-get resolution policy.

use crate::store::Repository;
use crate::{Error, Exercise, ExerciseCategory, ExerciseId, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What happens when a named exercise is not in the catalog
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MissingExercisePolicy {
    /// Insert a minimal stub and continue
    #[default]
    CreateStub,
    /// Fail with `NotFound`
    Strict,
}

/// How a block item names its exercise
#[derive(Clone, Debug, PartialEq)]
pub enum ExerciseRef {
    Id(ExerciseId),
    Named {
        name: String,
        category: Option<ExerciseCategory>,
    },
}

impl ExerciseRef {
    pub fn named(name: impl Into<String>) -> Self {
        ExerciseRef::Named {
            name: name.into(),
            category: None,
        }
    }
}

impl From<ExerciseId> for ExerciseRef {
    fn from(id: ExerciseId) -> Self {
        ExerciseRef::Id(id)
    }
}

#[derive(Clone)]
pub struct ExerciseCatalog {
    repo: Arc<dyn Repository>,
    policy: MissingExercisePolicy,
    stub_category: ExerciseCategory,
}

impl ExerciseCatalog {
    pub fn new(repo: Arc<dyn Repository>) -> Self {
        Self {
            repo,
            policy: MissingExercisePolicy::default(),
            stub_category: ExerciseCategory::default(),
        }
    }

    pub fn with_policy(mut self, policy: MissingExercisePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_stub_category(mut self, category: ExerciseCategory) -> Self {
        self.stub_category = category;
        self
    }

    pub fn policy(&self) -> MissingExercisePolicy {
        self.policy
    }

    pub fn add(&self, exercise: Exercise) -> Result<Exercise> {
        self.repo.save_exercise(&exercise)?;
        tracing::info!("Added exercise '{}' ({})", exercise.name, exercise.id);
        Ok(exercise)
    }

    pub fn get(&self, id: ExerciseId) -> Result<Exercise> {
        self.repo.get_exercise(id)
    }

    /// Remove an exercise nothing plans or records
    pub fn remove(&self, id: ExerciseId) -> Result<()> {
        if !self.repo.delete_exercise(id)? {
            return Err(Error::not_found("exercise", id));
        }
        tracing::info!("Removed exercise {}", id);
        Ok(())
    }

    pub fn list(&self) -> Result<Vec<Exercise>> {
        self.repo.list_exercises()
    }

    /// Case-insensitive substring search over names
    pub fn search(&self, query: &str) -> Result<Vec<Exercise>> {
        let needle = query.trim().to_lowercase();
        Ok(self
            .repo
            .list_exercises()?
            .into_iter()
            .filter(|e| e.name.to_lowercase().contains(&needle))
            .collect())
    }

    pub fn by_category(&self, category: ExerciseCategory) -> Result<Vec<Exercise>> {
        Ok(self
            .repo
            .list_exercises()?
            .into_iter()
            .filter(|e| e.category == Some(category))
            .collect())
    }

    /// Resolve a reference to a catalog exercise under the configured policy
    pub fn resolve(&self, reference: &ExerciseRef) -> Result<Exercise> {
        match reference {
            ExerciseRef::Id(id) => self.repo.get_exercise(*id),
            ExerciseRef::Named { name, category } => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(Error::Validation("exercise name must not be empty".into()));
                }
                let policy = self.policy;
                let category = category.unwrap_or(self.stub_category);
                let (exercise, created) =
                    self.repo.find_or_insert_exercise(name, &mut || match policy {
                        MissingExercisePolicy::CreateStub => Ok(Exercise::stub(name, category)),
                        MissingExercisePolicy::Strict => Err(Error::not_found("exercise", name)),
                    })?;
                if created {
                    tracing::info!(
                        "Created stub exercise '{}' ({}) in category {:?}",
                        exercise.name,
                        exercise.id,
                        category
                    );
                }
                Ok(exercise)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::ExerciseComplexity;

    fn catalog() -> ExerciseCatalog {
        ExerciseCatalog::new(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn test_stub_policy_creates_exactly_one() {
        let catalog = catalog().with_stub_category(ExerciseCategory::Kettlebell);
        let first = catalog.resolve(&ExerciseRef::named("Turkish Get-Up")).unwrap();
        let second = catalog.resolve(&ExerciseRef::named("turkish get-up")).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.category, Some(ExerciseCategory::Kettlebell));
        assert_eq!(first.complexity, Some(ExerciseComplexity::Intermediate));
        assert_eq!(catalog.list().unwrap().len(), 1);
    }

    #[test]
    fn test_remove_unknown_exercise_is_not_found() {
        let catalog = catalog();
        let rower = catalog.add(Exercise::new("Rower")).unwrap();
        catalog.remove(rower.id).unwrap();
        assert!(catalog.get(rower.id).unwrap_err().is_not_found());
        assert!(catalog.remove(rower.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_strict_policy_fails_not_found() {
        let catalog = catalog().with_policy(MissingExercisePolicy::Strict);
        let err = catalog.resolve(&ExerciseRef::named("Snatch")).unwrap_err();
        assert!(err.is_not_found());
        assert!(catalog.list().unwrap().is_empty());

        let existing = catalog.add(Exercise::new("Snatch")).unwrap();
        let found = catalog.resolve(&ExerciseRef::named("SNATCH")).unwrap();
        assert_eq!(found.id, existing.id);
    }

    #[test]
    fn test_unknown_id_always_fails() {
        let catalog = catalog();
        let err = catalog.resolve(&ExerciseRef::Id(ExerciseId::new())).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_name_match_is_exact_not_substring() {
        let catalog = catalog();
        catalog.add(Exercise::new("Front Squat")).unwrap();
        let squat = catalog.resolve(&ExerciseRef::named("Squat")).unwrap();
        assert_eq!(squat.name, "Squat");
        assert_eq!(catalog.list().unwrap().len(), 2);
        assert_eq!(catalog.search("squat").unwrap().len(), 2);
    }
}
