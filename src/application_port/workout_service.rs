use crate::domain_model::*;
use crate::gateway::ApiError;

#[async_trait::async_trait]
pub trait WorkoutService: Send + Sync {
    /// Muscle groups, as used to filter the exercise catalogue.
    async fn groups(&self) -> Result<Vec<String>, ApiError>;
    async fn exercises_by_group(&self, group: &str) -> Result<Vec<Exercise>, ApiError>;
    async fn exercise(&self, id: ExerciseId) -> Result<Exercise, ApiError>;
    /// Records that the signed-in user did `id` now.
    async fn register_exercise(&self, id: ExerciseId) -> Result<(), ApiError>;
    async fn history(&self) -> Result<Vec<HistoryByDay>, ApiError>;
    fn thumb_url(&self, exercise: &Exercise) -> String;
    fn demo_url(&self, exercise: &Exercise) -> String;
}
