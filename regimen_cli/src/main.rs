use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use regimen_core::analytics::window_ending;
use regimen_core::*;
use std::path::PathBuf;
use std::sync::Arc;

/// Subject used when `--subject` is not given
const LOCAL_SUBJECT: uuid::Uuid = uuid::Uuid::nil();

#[derive(Parser)]
#[command(name = "regimen")]
#[command(about = "Structured training planner and workout log", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Fail on exercise names missing from the catalog instead of creating stubs
    #[arg(long, global = true)]
    strict_exercises: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage training programs
    #[command(subcommand)]
    Program(ProgramCommand),

    /// Manage session templates
    #[command(subcommand)]
    Session(SessionCommand),

    /// Manage exercise blocks
    #[command(subcommand)]
    Block(BlockCommand),

    /// Manage block items
    #[command(subcommand)]
    Item(ItemCommand),

    /// Browse the exercise catalog
    #[command(subcommand)]
    Exercise(ExerciseCommand),

    /// Record workouts
    #[command(subcommand)]
    Workout(WorkoutCommand),

    /// Range analytics for a subject
    Analytics {
        #[command(flatten)]
        range: RangeArgs,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Plain-text report for one block type
    Report {
        /// Block type, e.g. emom, tabata, circuit
        #[arg(long = "type")]
        block_type: BlockType,

        #[command(flatten)]
        range: RangeArgs,
    },

    /// Export set results to CSV
    Export {
        /// Output CSV path
        #[arg(long)]
        output: PathBuf,

        /// Limit to one subject
        #[arg(long)]
        subject: Option<SubjectId>,
    },
}

#[derive(Subcommand)]
enum ProgramCommand {
    Create {
        title: String,
        #[arg(long, default_value_t = 4)]
        weeks: u32,
        #[arg(long)]
        description: Option<String>,
    },
    List,
    Show {
        id: ProgramId,
        #[arg(long)]
        json: bool,
    },
    /// Set the start date and derive the end date
    Start {
        id: ProgramId,
        /// Defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    Delete {
        id: ProgramId,
    },
}

#[derive(Subcommand)]
enum SessionCommand {
    Add {
        program_id: ProgramId,
        title: String,
        #[arg(long)]
        description: Option<String>,
    },
}

#[derive(Subcommand)]
enum BlockCommand {
    Add {
        session_id: SessionTemplateId,
        label: String,
        #[arg(long = "type", default_value = "straight_sets")]
        block_type: BlockType,
        #[arg(long)]
        rounds: Option<u32>,
        #[arg(long)]
        interval_seconds: Option<u32>,
        #[arg(long)]
        duration_seconds: Option<u32>,
        #[arg(long)]
        work_seconds: Option<u32>,
        #[arg(long)]
        rest_seconds: Option<u32>,
        #[arg(long)]
        instructions: Option<String>,
    },
}

#[derive(Subcommand)]
enum ItemCommand {
    Add(ItemArgs),
}

#[derive(Args)]
struct ItemArgs {
    block_id: ExerciseBlockId,

    /// Exercise id or name
    #[arg(long)]
    exercise: String,

    /// Category for an exercise created from its name
    #[arg(long)]
    category: Option<ExerciseCategory>,

    #[arg(long, default_value = "straight_sets")]
    set_type: SetType,
    #[arg(long, default_value_t = 1)]
    sets: u32,
    #[arg(long)]
    reps: Option<u32>,
    /// Upper bound when the reps are a range
    #[arg(long)]
    reps_max: Option<u32>,
    #[arg(long)]
    weight: Option<f64>,
    #[arg(long, default_value = "kg")]
    unit: WeightUnit,
    #[arg(long)]
    percent_1rm: Option<f64>,
    #[arg(long)]
    tempo: Option<String>,
    #[arg(long)]
    rest_seconds: Option<u32>,
    #[arg(long)]
    work_seconds: Option<u32>,
    #[arg(long)]
    emom_interval: Option<u32>,
    #[arg(long)]
    emom_minutes: Option<u32>,
    #[arg(long)]
    tabata_rounds: Option<u32>,
    #[arg(long)]
    drop_stages: Option<u32>,
    /// Comma-separated percentage reductions, one per stage
    #[arg(long)]
    drop_reductions: Option<String>,
    /// Pyramid steps such as 12-10-8-6
    #[arg(long)]
    pyramid: Option<String>,
    /// Position within a superset or circuit
    #[arg(long)]
    position: Option<u32>,
    #[arg(long, default_value_t = 1)]
    week_start: u32,
    #[arg(long)]
    week_end: Option<u32>,
}

#[derive(Subcommand)]
enum ExerciseCommand {
    List {
        /// Case-insensitive name filter
        #[arg(long)]
        search: Option<String>,
    },
    /// Remove an exercise no plan or workout references
    Delete {
        id: ExerciseId,
    },
}

#[derive(Subcommand)]
enum WorkoutCommand {
    /// Start a session from a template, or an ad-hoc one
    Start {
        #[arg(long, conflicts_with = "ad_hoc")]
        session: Option<SessionTemplateId>,
        #[arg(long)]
        ad_hoc: bool,
        #[arg(long)]
        subject: Option<SubjectId>,
        /// Date of an ad-hoc session
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    LogSet(LogSetArgs),
    LogBlock(LogBlockArgs),
    /// Record a WOD score such as 21+5 or 12:34
    Score {
        id: WorkoutResultId,
        wod: String,
        #[arg(long)]
        rounds: Option<u32>,
        #[arg(long)]
        rx: bool,
    },
    Finish {
        id: WorkoutResultId,
        #[arg(long)]
        status: Option<CompletionStatus>,
    },
    Show {
        id: WorkoutResultId,
        #[arg(long)]
        json: bool,
    },
    Delete {
        id: WorkoutResultId,
    },
    List {
        #[arg(long)]
        subject: Option<SubjectId>,
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
    },
}

#[derive(Args)]
struct LogSetArgs {
    id: WorkoutResultId,

    /// Planned block item this set performs
    #[arg(long, conflicts_with_all = ["exercise", "block"])]
    item: Option<BlockItemId>,
    /// Exercise id or name for an unplanned set
    #[arg(long, requires = "block")]
    exercise: Option<String>,
    /// Block label for an unplanned set
    #[arg(long)]
    block: Option<String>,
    #[arg(long)]
    order: Option<u32>,

    #[arg(long = "set", default_value_t = 1)]
    set_number: u32,
    #[arg(long = "type")]
    result_type: Option<ResultType>,
    #[arg(long)]
    round: Option<u32>,
    #[arg(long)]
    interval: Option<u32>,
    #[arg(long)]
    reps: Option<u32>,
    #[arg(long)]
    weight: Option<f64>,
    #[arg(long, default_value = "kg")]
    unit: WeightUnit,
    #[arg(long)]
    rpe: Option<f64>,
    #[arg(long)]
    rir: Option<u32>,
    #[arg(long)]
    work_seconds: Option<u32>,
    #[arg(long)]
    rest_seconds: Option<u32>,
    #[arg(long)]
    failure: bool,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Args)]
struct LogBlockArgs {
    id: WorkoutResultId,

    /// Planned block this result covers
    #[arg(long, conflicts_with = "label")]
    block: Option<ExerciseBlockId>,
    /// Label of an unplanned block
    #[arg(long, requires = "block_type")]
    label: Option<String>,
    #[arg(long = "type")]
    block_type: Option<BlockType>,

    /// EMOM minutes (or rounds) completed
    #[arg(long)]
    completed: Option<u32>,
    /// EMOM minute target, defaults to the planned duration
    #[arg(long)]
    target: Option<u32>,
    #[arg(long, default_value_t = 0)]
    failed: u32,
    #[arg(long)]
    avg_reps: Option<f64>,
    /// Comma-separated round times in seconds
    #[arg(long)]
    round_times: Option<String>,
    #[arg(long)]
    rest_between: Option<f64>,
    #[arg(long)]
    target_rounds: Option<u32>,
    #[arg(long)]
    total_seconds: Option<u32>,
    #[arg(long)]
    rpe: Option<f64>,
    #[arg(long)]
    notes: Option<String>,
}

#[derive(Args)]
struct RangeArgs {
    #[arg(long)]
    subject: Option<SubjectId>,
    /// Defaults to the configured window before --to
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Defaults to today
    #[arg(long)]
    to: Option<NaiveDate>,
}

struct App {
    config: Config,
    clock: Arc<dyn Clock>,
    repo: Arc<dyn Repository>,
    planning: PlanningService,
    recording: RecordingService,
    analytics: AnalyticsService,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load()?;
    regimen_core::logging::init_with_level(&config.logging.level);

    // Determine data directory
    let data_dir = cli
        .data_dir
        .clone()
        .unwrap_or_else(|| config.data.data_dir.clone());
    let repo: Arc<dyn Repository> = Arc::new(FileStore::open(&data_dir)?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let mut planning = PlanningService::from_config(Arc::clone(&repo), &config.planning);
    if cli.strict_exercises {
        planning = planning.with_policy(MissingExercisePolicy::Strict);
    }
    let app = App {
        recording: RecordingService::new(Arc::clone(&repo), Arc::clone(&clock)),
        analytics: AnalyticsService::new(Arc::clone(&repo)),
        planning,
        repo,
        clock,
        config,
    };

    match cli.command {
        Commands::Program(cmd) => cmd_program(&app, cmd),
        Commands::Session(SessionCommand::Add {
            program_id,
            title,
            description,
        }) => {
            let session = app
                .planning
                .add_session_template(program_id, &title, description)?;
            println!("{}", session.id);
            Ok(())
        }
        Commands::Block(cmd) => cmd_block(&app, cmd),
        Commands::Item(ItemCommand::Add(args)) => cmd_item_add(&app, args),
        Commands::Exercise(ExerciseCommand::List { search }) => {
            let exercises = match search {
                Some(q) => app.planning.catalog().search(&q)?,
                None => app.planning.catalog().list()?,
            };
            for e in exercises {
                let category = e.category.map(|c| c.display_name()).unwrap_or("-");
                println!("{}  {:<28} {}", e.id, e.name, category);
            }
            Ok(())
        }
        Commands::Exercise(ExerciseCommand::Delete { id }) => {
            app.planning.catalog().remove(id)?;
            println!("✓ Deleted exercise {}", id);
            Ok(())
        }
        Commands::Workout(cmd) => cmd_workout(&app, cmd),
        Commands::Analytics { range, json } => {
            let (subject, start, end) = resolve_range(&app, &range);
            let report = app.analytics.generate_analytics(subject, start, end)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report);
            }
            Ok(())
        }
        Commands::Report { block_type, range } => {
            let (subject, start, end) = resolve_range(&app, &range);
            let report = app
                .analytics
                .generate_methodology_report(subject, block_type, start, end)?;
            println!("{}", report.trim_end());
            Ok(())
        }
        Commands::Export { output, subject } => {
            let filter = WorkoutFilter {
                subject_id: subject,
                ..WorkoutFilter::default()
            };
            let rows = export_set_results(&*app.repo, &filter, &output)?;
            println!("✓ Exported {} set results", rows);
            println!("  CSV: {}", output.display());
            Ok(())
        }
    }
}

fn cmd_program(app: &App, cmd: ProgramCommand) -> Result<()> {
    match cmd {
        ProgramCommand::Create {
            title,
            weeks,
            description,
        } => {
            let mut program = app.planning.create_program(&title, weeks)?;
            if description.is_some() {
                program = app.planning.update_program(
                    program.id,
                    planning::ProgramChanges {
                        description: Some(description),
                        ..Default::default()
                    },
                )?;
            }
            println!("{}", program.id);
        }
        ProgramCommand::List => {
            for p in app.planning.list_programs()? {
                let dates = match (p.start_date, p.end_date) {
                    (Some(s), Some(e)) => format!("{} → {}", s, e),
                    _ => "not started".into(),
                };
                println!(
                    "{}  {:<28} {} weeks, {} sessions, {}",
                    p.id,
                    p.title,
                    p.total_weeks,
                    p.sessions.len(),
                    dates
                );
            }
        }
        ProgramCommand::Show { id, json } => {
            let program = app.planning.get_program(id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&program)?);
            } else {
                display_program(app, &program)?;
            }
        }
        ProgramCommand::Start { id, date } => {
            let date = date.unwrap_or_else(|| app.clock.today());
            let program = app.planning.start_program(id, date)?;
            println!("✓ Started '{}'", program.title);
            if let (Some(s), Some(e)) = (program.start_date, program.end_date) {
                println!("  {} → {}", s, e);
            }
        }
        ProgramCommand::Delete { id } => {
            app.planning.delete_program(id)?;
            println!("✓ Deleted program {}", id);
        }
    }
    Ok(())
}

fn cmd_block(app: &App, cmd: BlockCommand) -> Result<()> {
    let BlockCommand::Add {
        session_id,
        label,
        block_type,
        rounds,
        interval_seconds,
        duration_seconds,
        work_seconds,
        rest_seconds,
        instructions,
    } = cmd;

    let mut block = match block_type {
        BlockType::Tabata => ExerciseBlock::tabata(label, rounds.unwrap_or(8)),
        BlockType::Emom => ExerciseBlock::emom(
            label,
            interval_seconds.unwrap_or(60),
            duration_seconds.unwrap_or(600),
        ),
        BlockType::Amrap => ExerciseBlock::amrap(label, duration_seconds.unwrap_or(600)),
        _ => {
            let mut block = ExerciseBlock::new(label, block_type);
            block.timing.total_rounds = rounds;
            block.timing.block_duration_seconds = duration_seconds;
            block.timing.interval_seconds = interval_seconds;
            block
        }
    };
    if work_seconds.is_some() {
        block.timing.work_phase_seconds = work_seconds;
    }
    if rest_seconds.is_some() {
        block.timing.rest_phase_seconds = rest_seconds;
        block.timing.rest_between_items_seconds = rest_seconds;
    }
    block.instructions = instructions;

    let block = app.planning.add_block(session_id, block)?;
    println!("{}", block.id);
    Ok(())
}

fn cmd_item_add(app: &App, args: ItemArgs) -> Result<()> {
    let reference = exercise_ref(&args.exercise, args.category);

    let mut advanced = match args.set_type {
        SetType::Emom => AdvancedPrescription::emom(
            args.emom_interval.unwrap_or(1),
            args.reps.unwrap_or(0),
            args.emom_minutes.unwrap_or(10),
        ),
        SetType::Tabata => AdvancedPrescription::tabata(args.tabata_rounds.unwrap_or(8)),
        SetType::DropSet | SetType::MechanicalDropSet => {
            let reductions = match &args.drop_reductions {
                Some(list) => parse_list::<f64>(list)?,
                None => Vec::new(),
            };
            let stages = args
                .drop_stages
                .unwrap_or(u32::try_from(reductions.len()).unwrap_or(0));
            let mut p = AdvancedPrescription::drop_set(stages, reductions);
            p.set_type = args.set_type;
            p
        }
        set_type => AdvancedPrescription::new(set_type),
    };

    advanced.sets = args.sets;
    if let Some(reps) = args.reps {
        advanced.reps = Some(match args.reps_max {
            Some(max) => RepTarget::Range { min: reps, max },
            None => RepTarget::Exact { reps },
        });
    }
    if let Some(weight) = args.weight {
        advanced.load = Some(Load::Absolute {
            weight,
            unit: args.unit,
        });
    } else if let Some(percent) = args.percent_1rm {
        advanced.load = Some(Load::PercentOfOneRepMax { percent });
    }
    if let Some(tempo) = &args.tempo {
        advanced.tempo = Some(Tempo::parse(tempo));
    }
    if args.rest_seconds.is_some() {
        advanced.rest_seconds = args.rest_seconds;
    }
    if args.work_seconds.is_some() {
        advanced.work_time_seconds = args.work_seconds;
    }
    if args.pyramid.is_some() {
        advanced.pyramid_structure = args.pyramid.clone();
    }
    match args.set_type {
        SetType::Superset | SetType::Triset | SetType::GiantSet => {
            advanced.superset_position = args.position;
        }
        SetType::Circuit => advanced.circuit_position = args.position,
        _ => {}
    }
    let advanced = advanced.with_weeks(args.week_start, args.week_end.unwrap_or(args.week_start));

    let item = app
        .planning
        .add_block_item(args.block_id, &reference, Prescription::Advanced(advanced))?;
    println!("{}", item.id);
    Ok(())
}

fn cmd_workout(app: &App, cmd: WorkoutCommand) -> Result<()> {
    match cmd {
        WorkoutCommand::Start {
            session,
            ad_hoc,
            subject,
            date,
        } => {
            let subject = subject.unwrap_or(SubjectId(LOCAL_SUBJECT));
            let workout = match session {
                Some(template_id) => app.recording.start_session(template_id, subject)?,
                None if ad_hoc => app.recording.start_ad_hoc_session(subject, date)?,
                None => {
                    return Err(Error::Validation(
                        "pass --session <id> or --ad-hoc".into(),
                    ))
                }
            };
            println!("{}", workout.id);
        }
        WorkoutCommand::LogSet(args) => cmd_log_set(app, args)?,
        WorkoutCommand::LogBlock(args) => cmd_log_block(app, args)?,
        WorkoutCommand::Score {
            id,
            wod,
            rounds,
            rx,
        } => {
            let workout = app.recording.set_wod_result(id, Some(wod), rounds, Some(rx))?;
            println!(
                "✓ Scored {}: {}",
                workout.id,
                workout.wod_result.as_deref().unwrap_or("-")
            );
        }
        WorkoutCommand::Finish { id, status } => {
            if let Some(status) = status {
                app.recording.set_completion_status(id, status)?;
            }
            let workout = app.recording.finish_session(id)?;
            let agg = workout.aggregates();
            println!("✓ Session finished!");
            println!(
                "  Duration: {}",
                results::format_for_time(workout.total_duration_seconds.unwrap_or(0))
            );
            println!("  Reps: {}  Volume: {:.1}", agg.total_reps, agg.total_volume_load);
            if agg.rpe_sample_count > 0 {
                println!("  Avg RPE: {:.1}", agg.average_rpe);
            }
            for pr in workout.personal_records() {
                let name = app
                    .repo
                    .find_exercise(pr.exercise_id)?
                    .map(|e| e.name)
                    .unwrap_or_else(|| pr.exercise_id.to_string());
                println!(
                    "  ★ PR {}: e1RM {:.1} (was {:.1})",
                    name, pr.estimated_one_rep_max, pr.previous_best
                );
            }
        }
        WorkoutCommand::Show { id, json } => {
            let workout = app.recording.find_by_id(id)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&workout)?);
            } else {
                display_workout(app, &workout)?;
            }
        }
        WorkoutCommand::Delete { id } => {
            app.recording.delete_session(id)?;
            println!("✓ Deleted workout {}", id);
        }
        WorkoutCommand::List { subject, from, to } => {
            let subject = subject.unwrap_or(SubjectId(LOCAL_SUBJECT));
            let workouts = match (from, to) {
                (None, None) => app.recording.find_by_subject(subject)?,
                (from, to) => app.recording.find_by_subject_and_range(
                    subject,
                    from.unwrap_or(NaiveDate::MIN),
                    to.unwrap_or(NaiveDate::MAX),
                )?,
            };
            for w in workouts {
                let state = if w.is_finalized() { "finished" } else { "open" };
                println!(
                    "{}  {}  {:<8} {} sets  {}",
                    w.id,
                    w.date,
                    state,
                    w.set_results().len(),
                    w.wod_result.as_deref().unwrap_or("")
                );
            }
        }
    }
    Ok(())
}

fn cmd_log_set(app: &App, args: LogSetArgs) -> Result<()> {
    let mut entry = match (args.item, &args.exercise) {
        (Some(item), _) => SetEntry::planned(item, args.set_number),
        (None, Some(exercise)) => {
            let exercise = app.planning.catalog().resolve(&exercise_ref(exercise, None))?;
            SetEntry::ad_hoc(
                exercise.id,
                args.block.clone().unwrap_or_default(),
                args.order.unwrap_or(1),
                args.set_number,
            )
        }
        (None, None) => {
            return Err(Error::Validation(
                "pass --item <id> or --exercise with --block".into(),
            ))
        }
    };
    entry.result_type = args.result_type;
    entry.round_number = args.round;
    entry.interval_number = args.interval;
    entry.performed_reps = args.reps;
    entry.weight = args.weight;
    entry.weight_unit = args.unit;
    entry.rpe = args.rpe;
    entry.rir = args.rir;
    entry.work_time_seconds = args.work_seconds;
    entry.rest_time_seconds = args.rest_seconds;
    entry.reached_failure = args.failure;
    entry.notes = args.notes;

    let set = app.recording.record_set(args.id, entry)?;
    println!("{}", set.id);
    Ok(())
}

fn cmd_log_block(app: &App, args: LogBlockArgs) -> Result<()> {
    let (planned, block_type) = match args.block {
        Some(block_id) => {
            let (_, block) = app.planning.find_block(block_id)?;
            let block_type = block.block_type;
            (Some(block), block_type)
        }
        None => {
            let block_type = args
                .block_type
                .ok_or_else(|| Error::Validation("pass --block <id> or --label with --type".into()))?;
            (None, block_type)
        }
    };

    let round_times = match &args.round_times {
        Some(list) => parse_list::<u32>(list)?,
        None => Vec::new(),
    };
    let completed = args.completed.unwrap_or(0);
    let metrics = match block_type {
        BlockType::Emom => {
            let planned_minutes = planned
                .as_ref()
                .and_then(|b| b.timing.block_duration_seconds)
                .map(|s| s / 60);
            BlockMetrics::Emom {
                minutes_completed: completed,
                minutes_target: args.target.or(planned_minutes).unwrap_or(0),
                failed_minutes: args.failed,
            }
        }
        BlockType::Tabata => BlockMetrics::Tabata {
            rounds_completed: completed,
            average_reps: args.avg_reps.unwrap_or(0.0),
        },
        BlockType::Circuit => BlockMetrics::Circuit {
            rounds_completed: completed,
            round_times_seconds: round_times,
        },
        BlockType::Superset | BlockType::Triset | BlockType::GiantSet => BlockMetrics::Superset {
            rounds_completed: completed,
            round_times_seconds: round_times,
            average_rest_between_exercises: None,
            average_rest_between_supersets: args.rest_between,
        },
        _ => BlockMetrics::General,
    };

    let mut entry = match (&planned, args.label) {
        (Some(block), _) => BlockEntry::planned(block.id, metrics),
        (None, Some(label)) => BlockEntry::ad_hoc(label, block_type, metrics),
        (None, None) => {
            return Err(Error::Validation("an unplanned block needs --label".into()));
        }
    };
    entry.target_rounds = args.target_rounds;
    entry.total_time_seconds = args.total_seconds;
    entry.average_rpe = args.rpe;
    entry.notes = args.notes;

    let block = app.recording.record_block_result(args.id, entry)?;
    println!("{}", block.id);
    Ok(())
}

fn resolve_range(app: &App, range: &RangeArgs) -> (SubjectId, NaiveDate, NaiveDate) {
    let subject = range.subject.unwrap_or(SubjectId(LOCAL_SUBJECT));
    let end = range.to.unwrap_or_else(|| app.clock.today());
    let start = range
        .from
        .unwrap_or_else(|| window_ending(end, app.config.analytics.default_window_days).0);
    (subject, start, end)
}

fn exercise_ref(input: &str, category: Option<ExerciseCategory>) -> ExerciseRef {
    match input.parse::<ExerciseId>() {
        Ok(id) => ExerciseRef::Id(id),
        Err(_) => ExerciseRef::Named {
            name: input.to_string(),
            category,
        },
    }
}

fn parse_list<T: std::str::FromStr>(input: &str) -> Result<Vec<T>> {
    input
        .split(',')
        .map(|part| {
            part.trim()
                .parse()
                .map_err(|_| Error::Validation(format!("invalid list entry '{}'", part.trim())))
        })
        .collect()
}

fn exercise_name(app: &App, id: ExerciseId) -> Result<String> {
    Ok(app
        .repo
        .find_exercise(id)?
        .map(|e| e.name)
        .unwrap_or_else(|| id.to_string()))
}

fn display_program(app: &App, program: &Program) -> Result<()> {
    println!("\n{} ({} weeks)", program.title, program.total_weeks);
    if let Some(ref description) = program.description {
        println!("  {}", description);
    }
    if let (Some(s), Some(e)) = (program.start_date, program.end_date) {
        println!("  {} → {}", s, e);
    }
    for session in &program.sessions {
        println!("\n  {}. {}  [{}]", session.order_index, session.title, session.id);
        for block in &session.blocks {
            println!(
                "    {} {}  [{}]",
                block.label,
                block.block_type.display_name(),
                block.id
            );
            for item in &block.items {
                println!(
                    "      {}. {:<24} {}  [{}]",
                    item.order_index,
                    exercise_name(app, item.exercise_id)?,
                    item.prescription.summary(),
                    item.id
                );
            }
        }
    }
    println!();
    Ok(())
}

fn display_workout(app: &App, workout: &WorkoutResult) -> Result<()> {
    let state = if workout.is_finalized() { "finished" } else { "in progress" };
    println!("\nWorkout {} on {} ({})", workout.id, workout.date, state);
    if let Some(status) = workout.completion_status {
        println!("  Status: {}", status.description());
    }
    if let Some(ref wod) = workout.wod_result {
        println!("  WOD: {}", wod);
    }
    for set in workout.set_results() {
        let load = match set.weight {
            Some(w) => format!("{:.1}{}", w, set.weight_unit.symbol()),
            None => "-".into(),
        };
        println!(
            "  {}.{} #{:<3} {:<24} {:<14} reps {:<4} {}",
            set.block_label,
            set.block_item_order,
            set.sequence_number(),
            exercise_name(app, set.exercise_id)?,
            set.result_type.display_name(),
            set.performed_reps.map_or_else(|| "-".to_string(), |r| r.to_string()),
            load
        );
    }
    for block in workout.block_results() {
        let completion = block
            .completion()
            .completion_percentage
            .map_or_else(|| "-".to_string(), |p| format!("{:.1}%", p));
        println!(
            "  [{}] {} {} ({})",
            block.block_label,
            block.block_type.display_name(),
            completion,
            block.performance_rating()
        );
    }
    let agg = workout.aggregates();
    println!(
        "  Reps: {}  Volume: {:.1}  Avg RPE: {:.1}",
        agg.total_reps, agg.total_volume_load, agg.average_rpe
    );
    println!();
    Ok(())
}
