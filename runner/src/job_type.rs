use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::JobError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobType {
    #[serde(rename = "REGISTER_SOURCE")]
    RegisterSource,
    #[serde(rename = "CREATE_TRANSFORMATION")]
    CreateTransformation,
    #[serde(rename = "CREATE_TRAINING_SET")]
    CreateTrainingSet,
    #[serde(rename = "MATERIALIZE")]
    Materialize,
    #[serde(rename = "COPY_TO_ONLINE")]
    CopyToOnline,
}

impl JobType {
    pub const ALL: [JobType; 5] = [
        JobType::RegisterSource,
        JobType::CreateTransformation,
        JobType::CreateTrainingSet,
        JobType::Materialize,
        JobType::CopyToOnline,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            JobType::RegisterSource => "REGISTER_SOURCE",
            JobType::CreateTransformation => "CREATE_TRANSFORMATION",
            JobType::CreateTrainingSet => "CREATE_TRAINING_SET",
            JobType::Materialize => "MATERIALIZE",
            JobType::CopyToOnline => "COPY_TO_ONLINE",
        }
    }
}

impl Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for JobType {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        JobType::ALL
            .iter()
            .find(|t| t.key() == s)
            .copied()
            .ok_or_else(|| JobError::UnknownJobType(s.to_string()))
    }
}
