use gymtrack::application_port::*;
use gymtrack::client::Client;
use gymtrack::domain_model::*;
use gymtrack::logger::*;
use gymtrack::settings::*;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    debug!(?project_settings);
    logger.reload_from_config(&LogConfig::from(&project_settings.log))?;

    let client = Client::try_new(&project_settings).await?;
    let result = run(&client, cli.command).await;
    client.shutdown().await;
    result
}

async fn run(client: &Client, command: Option<Command>) -> anyhow::Result<()> {
    let sessions = &client.session_service;
    let workouts = &client.workout_service;

    match command.unwrap_or(Command::Whoami) {
        Command::SignIn { email, password } => {
            let user = sessions.sign_in(SignInInput { email, password }).await?;
            println!("Signed in as {} <{}>", user.name, user.email);
        }
        Command::SignUp {
            name,
            email,
            password,
        } => {
            sessions
                .sign_up(SignUpInput {
                    name,
                    email,
                    password,
                })
                .await?;
            println!("Account created, you can sign in now");
        }
        Command::SignOut => {
            sessions.sign_out().await?;
            println!("Signed out");
        }
        Command::Whoami => match sessions.current_user() {
            Some(user) => {
                println!("{} <{}>", user.name, user.email);
                if let Some(url) = sessions.avatar_url(&user) {
                    println!("avatar: {}", url);
                }
            }
            None => println!("Not signed in"),
        },
        Command::Groups => {
            for group in workouts.groups().await? {
                println!("{}", group);
            }
        }
        Command::Exercises { group } => {
            let exercises = workouts.exercises_by_group(&group).await?;
            println!("{} exercise(s) in {}", exercises.len(), group);
            for exercise in exercises {
                println!(
                    "{:>4}  {:<28} {} x {}",
                    exercise.id, exercise.name, exercise.series, exercise.repetitions
                );
            }
        }
        Command::Exercise { id } => {
            let exercise = workouts.exercise(id).await?;
            println!("{} ({})", exercise.name, exercise.group);
            println!("{} series x {} repetitions", exercise.series, exercise.repetitions);
            println!("demo: {}", workouts.demo_url(&exercise));
        }
        Command::Done { id } => {
            workouts.register_exercise(id).await?;
            println!("Nice! Exercise {} recorded in your history", id);
        }
        Command::History => {
            let days = workouts.history().await?;
            if days.is_empty() {
                println!("No exercises recorded yet");
            }
            for day in days {
                println!("{}", day.title);
                for entry in day.data {
                    println!("  {}  {:<28} {}", entry.hour, entry.name, entry.group);
                }
            }
        }
        Command::Profile {
            name,
            old_password,
            password,
        } => {
            sessions
                .update_profile(ProfileUpdate {
                    name,
                    old_password,
                    password,
                })
                .await?;
            println!("Profile updated");
        }
        Command::Avatar { path } => {
            let Some(user) = sessions.current_user() else {
                return Err(anyhow::anyhow!("sign in before uploading an avatar"));
            };
            let extension = path
                .extension()
                .and_then(|e| e.to_str())
                .ok_or_else(|| anyhow::anyhow!("avatar file needs an extension: {:?}", path))?;
            let bytes = tokio::fs::read(&path).await?;
            let upload = AvatarUpload::for_user(&user, extension, bytes.into());
            let user = sessions.upload_avatar(upload).await?;
            println!("Avatar updated: {}", sessions.avatar_url(&user).unwrap_or_default());
        }
    }

    Ok(())
}
