use super::{Parser, Subcommand};
use crate::domain_model::ExerciseId;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gymtrack", about = "Workout tracker client")]
pub struct Cli {
    #[arg(long)]
    pub settings: Option<String>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    SignUp {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    SignOut,
    /// Show the signed-in user.
    Whoami,
    /// List muscle groups.
    Groups,
    /// List the exercises of a muscle group.
    Exercises { group: String },
    Exercise { id: ExerciseId },
    /// Mark an exercise as done today.
    Done { id: ExerciseId },
    History,
    Profile {
        #[arg(long)]
        name: String,
        #[arg(long)]
        old_password: Option<String>,
        #[arg(long)]
        password: Option<String>,
    },
    /// Upload a new avatar picture.
    Avatar { path: PathBuf },
}
