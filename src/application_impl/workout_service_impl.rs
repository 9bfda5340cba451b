use crate::application_port::WorkoutService;
use crate::domain_model::*;
use crate::gateway::{ApiError, AuthGateway};
use serde::Serialize;
use serde::de::IgnoredAny;
use std::sync::Arc;

#[derive(Serialize)]
struct RegisterHistory {
    exercise_id: ExerciseId,
}

pub struct RealWorkoutService {
    gateway: Arc<AuthGateway>,
}

impl RealWorkoutService {
    pub fn new(gateway: Arc<AuthGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait::async_trait]
impl WorkoutService for RealWorkoutService {
    async fn groups(&self) -> Result<Vec<String>, ApiError> {
        self.gateway.get("/groups").await
    }

    async fn exercises_by_group(&self, group: &str) -> Result<Vec<Exercise>, ApiError> {
        self.gateway
            .get(&format!("/exercises/bygroup/{}", group))
            .await
    }

    async fn exercise(&self, id: ExerciseId) -> Result<Exercise, ApiError> {
        self.gateway.get(&format!("/exercises/{}", id)).await
    }

    async fn register_exercise(&self, id: ExerciseId) -> Result<(), ApiError> {
        let _: IgnoredAny = self
            .gateway
            .send_json(Method::Post, "/history", &RegisterHistory { exercise_id: id })
            .await?;
        Ok(())
    }

    async fn history(&self) -> Result<Vec<HistoryByDay>, ApiError> {
        self.gateway.get("/history").await
    }

    fn thumb_url(&self, exercise: &Exercise) -> String {
        format!("{}/exercise/thumb/{}", self.gateway.base_url(), exercise.thumb)
    }

    fn demo_url(&self, exercise: &Exercise) -> String {
        format!("{}/exercise/demo/{}", self.gateway.base_url(), exercise.demo)
    }
}
