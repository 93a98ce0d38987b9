use clap::{Parser, Subcommand};
use ironlog_core::*;
use std::path::PathBuf;

mod render;

#[derive(Parser)]
#[command(name = "ironlog")]
#[command(about = "Strength training log", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Session(SessionCommand),

    /// Manage the exercise catalog
    #[command(subcommand)]
    Exercise(ExerciseCommand),

    /// Manage programs
    #[command(subcommand)]
    Program(ProgramCommand),

    /// List past sessions, or show one
    History {
        #[arg(long)]
        program: Option<String>,

        #[arg(long)]
        block: Option<String>,

        /// Show a single session in full
        #[arg(long)]
        session: Option<uuid::Uuid>,
    },

    /// Export every logged set to CSV
    Export { path: PathBuf },

    /// Total volume, session count, gym time, week streak and this week's sets per muscle
    Status,
}

/// Commands that work on the session in progress
#[derive(Subcommand)]
enum SessionCommand {
    /// Start a session for a program block
    Start {
        program: String,
        block: String,

        /// Week of the block, when the program repeats block names across weeks
        #[arg(long)]
        week: Option<u32>,
    },

    /// Add a catalog exercise to the current session
    AddExercise {
        name: String,

        /// Number of sets
        #[arg(long, default_value_t = 3)]
        sets: usize,
    },

    /// Log an extra set for an exercise (1-based index)
    AddSet {
        exercise: usize,
        weight: f64,
        reps: u32,

        #[arg(long)]
        bodyweight: bool,
    },

    /// Fill in a set; the first empty set unless --set is given
    EditSet {
        exercise: usize,
        weight: f64,
        reps: u32,

        /// 1-based set to overwrite
        #[arg(long = "set")]
        set_index: Option<usize>,

        #[arg(long)]
        bodyweight: bool,
    },

    /// Swap an exercise for one of its variations (by name or 1-based index)
    Swap { exercise: usize, variation: String },

    /// Attach a note to an exercise in the current session
    Note {
        exercise: usize,
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Show the current session
    Show,

    /// Discard the current session
    Cancel,

    /// Finish and save the current session
    End,
}

#[derive(Subcommand)]
enum ExerciseCommand {
    /// Import exercises from a TOML file
    Import { file: PathBuf },

    /// Add a single exercise
    Add {
        name: String,

        /// Primary muscle (e.g. quads, chest, back)
        #[arg(long)]
        muscle: String,

        #[arg(long, default_value = "")]
        description: String,
    },

    /// Show an exercise with its best set and estimated 1RM
    Show { name: String },

    /// List all exercises
    List,
}

#[derive(Subcommand)]
enum ProgramCommand {
    /// Create or update a program from a TOML file
    Import { file: PathBuf },

    /// Show a program's blocks and exercises
    Show { name: String },

    /// List all programs
    List,

    /// Delete a program with its blocks; refused once sessions were logged against it
    Delete { name: String },
}

fn main() -> Result<()> {
    ironlog_core::logging::init();

    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(dir) = cli.data_dir {
        config.data.data_dir = dir;
    }

    tracing::debug!("Using data directory {:?}", config.data.data_dir);
    let mut db = Database::open(&config.database_path())?;

    let store = SessionStore::new(config.session_path());

    match cli.command {
        Commands::Exercise(cmd) => cmd_exercise(&mut db, cmd),
        Commands::Program(cmd) => cmd_program(&mut db, &store, cmd),
        Commands::History {
            program,
            block,
            session,
        } => cmd_history(&db, program, block, session),
        Commands::Export { path } => {
            let count = export_csv(&db, &path)?;
            if count == 0 {
                println!("No sets logged yet - nothing to export.");
            } else {
                println!("✓ Exported {} sets to {}", count, path.display());
            }
            Ok(())
        }
        Commands::Status => {
            let stats = training_stats(&db, chrono::Utc::now())?;
            print!("{}", render::stats(&stats));
            Ok(())
        }
        Commands::Session(cmd) => {
            let mut manager = SessionManager::new(db, store, &config.technique);
            cmd_session(&mut manager, cmd)
        }
    }
}

fn cmd_session(manager: &mut SessionManager, command: SessionCommand) -> Result<()> {
    match command {
        SessionCommand::Start {
            program,
            block,
            week,
        } => {
            let state = manager.start(&program, &block, week)?;
            println!("✓ Session started");
            print!("{}", render::session(&state, chrono::Utc::now()));
        }
        SessionCommand::AddExercise { name, sets } => {
            let entry = manager.add_exercise(&name, sets)?;
            let position = manager.current()?.exercises.len();
            println!(
                "✓ Added {} as exercise {} ({} sets)",
                entry.exercise.name,
                position,
                entry.sets.len()
            );
        }
        SessionCommand::AddSet {
            exercise,
            weight,
            reps,
            bodyweight,
        } => {
            let set = manager.add_set(exercise, weight, reps, bodyweight)?;
            println!("✓ Logged {}", render::set(&set));
        }
        SessionCommand::EditSet {
            exercise,
            weight,
            reps,
            set_index,
            bodyweight,
        } => {
            let slot = manager.edit_set(exercise, weight, reps, bodyweight, set_index)?;
            let state = manager.current()?;
            let entry = &state.exercises[exercise - 1];
            println!(
                "✓ {} set {}: {}",
                entry.exercise.name,
                slot,
                render::set(&entry.sets[slot - 1])
            );
        }
        SessionCommand::Swap {
            exercise,
            variation,
        } => {
            let swapped = manager.swap(exercise, &variation)?;
            println!("✓ Exercise {} is now {}", exercise, swapped.name);
        }
        SessionCommand::Note { exercise, text } => {
            manager.note(exercise, &text.join(" "))?;
            println!("✓ Note saved");
        }
        SessionCommand::Show => {
            let state = manager.current()?;
            print!("{}", render::session(&state, chrono::Utc::now()));
        }
        SessionCommand::Cancel => {
            manager.cancel()?;
            println!("✓ Session discarded");
        }
        SessionCommand::End => {
            let session = manager.end()?;
            println!("✓ Session saved");
            print!("{}", render::training_session(&session));
        }
    }
    Ok(())
}

fn cmd_exercise(db: &mut Database, command: ExerciseCommand) -> Result<()> {
    match command {
        ExerciseCommand::Import { file } => {
            let import = ExerciseImport::load(&file)?;
            let count = import_exercises(db, &import)?;
            println!("✓ Imported {} exercises", count);
        }
        ExerciseCommand::Add {
            name,
            muscle,
            description,
        } => {
            let muscle: Muscle = muscle.parse()?;
            let exercise = add_exercise(db, &name, &description, muscle)?;
            println!("✓ Added {} ({})", exercise.name, exercise.primary_muscle);
        }
        ExerciseCommand::Show { name } => {
            let exercise = catalog::exercise(db, &name)?;
            print!("{}", render::exercise(&exercise));
        }
        ExerciseCommand::List => {
            let exercises = db.list_exercises()?;
            if exercises.is_empty() {
                println!("No exercises yet. Import some with `ironlog exercise import <file>`.");
            }
            for exercise in &exercises {
                println!("{}", render::exercise_line(exercise));
            }
        }
    }
    Ok(())
}

fn cmd_program(db: &mut Database, store: &SessionStore, command: ProgramCommand) -> Result<()> {
    match command {
        ProgramCommand::Import { file } => {
            let definition = ProgramDefinition::load(&file)?;
            let report = import_or_update(db, &definition)?;
            let verb = if report.programs_inserted > 0 {
                "Created"
            } else {
                "Updated"
            };
            println!("✓ {} program {}", verb, definition.name.trim());
            println!(
                "  Blocks: {} added, {} updated",
                report.blocks_inserted, report.blocks_updated
            );
            println!(
                "  Exercises: {} added, {} updated",
                report.exercises_inserted, report.exercises_updated
            );
        }
        ProgramCommand::Show { name } => {
            let program = db
                .program_by_name(&name)?
                .ok_or_else(|| Error::NotFound(format!("program '{}'", name)))?;
            print!("{}", render::program(&program));
        }
        ProgramCommand::List => {
            let programs = db.list_programs()?;
            if programs.is_empty() {
                println!("No programs yet. Import one with `ironlog program import <file>`.");
            }
            for program in &programs {
                println!("{} ({} blocks)", program.name, program.blocks.len());
            }
        }
        ProgramCommand::Delete { name } => {
            let program = delete_program(db, store, &name)?;
            println!(
                "✓ Deleted program {} ({} blocks)",
                program.name,
                program.blocks.len()
            );
        }
    }
    Ok(())
}

fn cmd_history(
    db: &Database,
    program: Option<String>,
    block: Option<String>,
    session: Option<uuid::Uuid>,
) -> Result<()> {
    if let Some(id) = session {
        let session = db
            .session_by_id(id)?
            .ok_or_else(|| Error::NotFound(format!("session {}", id)))?;
        print!("{}", render::training_session(&session));
        return Ok(());
    }

    let sessions = db.list_sessions(program.as_deref(), block.as_deref())?;
    if sessions.is_empty() {
        println!("No sessions logged yet.");
    }
    print!("{}", render::history(&sessions));
    Ok(())
}
