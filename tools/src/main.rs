//! sim-runner: text and headless front end for the change simulation.
//!
//! Usage:
//!   sim-runner --variant change_pulse --team "Team 3: Operations"
//!   sim-runner --variant enterprise_rollout --team Blue --seed 7 --db class.db --resume
//!   sim-runner --ipc-mode --variant change_pulse
//!   sim-runner --dashboard --secret admin --source class.db

use anyhow::Result;
use changesim_core::{
    access::{AccessGate, Department, Role},
    command::PlayerCommand,
    config::SimConfig,
    dashboard::{self, InstructorDashboard},
    engine::SimEngine,
    error::{SimError, SimResult},
    event::SimEvent,
    render::{self, SessionView},
    store::SimStore,
    types::{Round, RunId, TeamId},
};
use std::env;
use std::io::{self, BufRead, Write};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Start { team: String },
    Submit { round: Round, choices: Vec<String> },
    Reset,
    Dashboard { secret: String },
    Quit,
}

/// One team's live session plus the optional decision log behind it.
struct RunContext<'a> {
    config:         &'a SimConfig,
    seed:           u64,
    /// `--run-id`, when given. Otherwise derived from the variant.
    pinned_run_id:  Option<RunId>,
    /// `--variant` was given: department roles do not switch catalogs.
    variant_pinned: bool,
    /// `--resume`: pick the team up from its latest snapshot.
    resume:         bool,
    engine:         SimEngine,
    store:          Option<SimStore>,
    team:           Option<TeamId>,
    department:     Option<Department>,
}

impl<'a> RunContext<'a> {
    fn new(
        config: &'a SimConfig,
        seed: u64,
        variant: Option<&str>,
        run_id: Option<&str>,
        store: Option<SimStore>,
        resume: bool,
    ) -> SimResult<Self> {
        let variant_id = variant.unwrap_or(&config.default_variant);
        let pinned_run_id = run_id.map(String::from);
        let run_id = pinned_run_id
            .clone()
            .unwrap_or_else(|| default_run_id(variant_id, seed));
        let ctx = Self {
            config,
            seed,
            pinned_run_id,
            variant_pinned: variant.is_some(),
            resume,
            engine: SimEngine::build(run_id, seed, config, variant_id)?,
            store,
            team: None,
            department: None,
        };
        ctx.register_run()?;
        Ok(ctx)
    }

    fn register_run(&self) -> SimResult<()> {
        if let Some(store) = self.store.as_ref() {
            let catalog = self.engine.catalog();
            store.insert_run(&self.engine.run_id, self.seed, &catalog.variant_id, &catalog.version)?;
        }
        Ok(())
    }

    fn set_team(&mut self, input: &str) -> SimResult<()> {
        let role = Role::parse(input);
        if role == Some(Role::Instructor) {
            return Err(SimError::Other(anyhow::anyhow!(
                "the instructor role has no team session; use --dashboard"
            )));
        }
        let name = role.map(|r| r.label()).unwrap_or_else(|| input.trim().to_string());
        if name.is_empty() {
            return Err(SimError::MissingIdentity);
        }
        let department = role.and_then(|r| r.department());
        if let Some(department) = department {
            self.switch_to_department(department)?;
        }

        // Read the snapshot before recording anything: recording a fresh
        // session would overwrite it.
        let resumed = self.resume && self.restore_snapshot(&name)?;
        let events = if resumed {
            Vec::new()
        } else {
            self.engine.start_session(&name)?
        };
        self.team = Some(name);
        self.department = department;
        self.record(&events);
        Ok(())
    }

    /// Move an untouched run onto the department's own decision set.
    fn switch_to_department(&mut self, department: Department) -> SimResult<()> {
        if self.variant_pinned || self.engine.teams().next().is_some() {
            return Ok(());
        }
        let config = self.config;
        let Some(catalog) = config.department_catalog(department) else {
            return Ok(());
        };
        if catalog.variant_id == self.engine.catalog().variant_id {
            return Ok(());
        }
        let run_id = self
            .pinned_run_id
            .clone()
            .unwrap_or_else(|| default_run_id(&catalog.variant_id, self.seed));
        log::info!("{} plays variant {}", department.label(), catalog.variant_id);
        self.engine = SimEngine::build(run_id, self.seed, config, &catalog.variant_id)?;
        self.register_run()
    }

    fn restore_snapshot(&mut self, team: &str) -> SimResult<bool> {
        let Some(store) = self.store.as_ref() else {
            return Ok(false);
        };
        match store.latest_snapshot(&self.engine.run_id, team)? {
            Some(snapshot) => {
                self.engine.restore(snapshot)?;
                Ok(true)
            }
            None => {
                log::info!("no snapshot for '{team}', starting fresh");
                Ok(false)
            }
        }
    }

    fn team(&self) -> Result<&str, SimError> {
        self.team.as_deref().ok_or(SimError::MissingIdentity)
    }

    fn execute(&mut self, command: PlayerCommand) -> Result<Vec<SimEvent>, SimError> {
        let team = self.team()?.to_string();
        let events = self.engine.execute(&team, &command)?;
        self.record(&events);
        Ok(events)
    }

    fn view(&self) -> Option<SessionView> {
        self.engine.view(self.team.as_deref()?)
    }

    /// Persist events and the team's latest snapshot. The log is optional:
    /// a write failure is reported and play continues.
    fn record(&mut self, events: &[SimEvent]) {
        let Some(store) = self.store.as_mut() else { return };
        if events.is_empty() {
            return;
        }
        if let Err(e) = store.record(&self.engine.run_id, events) {
            log::warn!("decision log write failed: {e}");
        }
        if let Some(snapshot) = self.team.as_deref().and_then(|t| self.engine.snapshot(t)) {
            if let Err(e) = store.save_snapshot(&snapshot) {
                log::warn!("snapshot write failed: {e}");
            }
        }
    }
}

fn default_run_id(variant_id: &str, seed: u64) -> RunId {
    format!("class-{variant_id}-{seed}")
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let seed = parse_arg(&args, "--seed", 42u64);
    let ipc_mode = has_flag(&args, "--ipc-mode");
    let data_dir = string_arg(&args, "--data-dir").unwrap_or("./data");

    let config = if std::path::Path::new(data_dir).is_dir() {
        SimConfig::load(data_dir)?
    } else {
        log::info!("{data_dir} not found, using built-in catalogs");
        SimConfig::builtin()?
    };

    if has_flag(&args, "--dashboard") {
        let secret = string_arg(&args, "--secret");
        let gate = AccessGate::new(config.instructor_secret.clone());
        if !gate.authorize(Role::Instructor, secret) {
            anyhow::bail!("Incorrect password");
        }
        let view = build_dashboard(&config, &args);
        if ipc_mode {
            println!("{}", serde_json::to_string(&view)?);
        } else {
            print!("{}", render::dashboard(&view));
        }
        return Ok(());
    }

    let store = match string_arg(&args, "--db") {
        Some(db) => {
            let store = SimStore::open(db)?;
            store.migrate()?;
            Some(store)
        }
        None => None,
    };

    let mut ctx = RunContext::new(
        &config,
        seed,
        string_arg(&args, "--variant"),
        string_arg(&args, "--run-id"),
        store,
        has_flag(&args, "--resume"),
    )?;
    if let Some(team) = string_arg(&args, "--team") {
        if let Err(e) = ctx.set_team(team) {
            eprintln!("{e}");
        }
    }

    if !ipc_mode {
        println!("Change Simulation: sim-runner");
        println!("  variant:   {}", ctx.engine.catalog().variant_id);
        println!("  seed:      {seed}");
        println!("  run_id:    {}", ctx.engine.run_id);
        println!();
    }

    if ipc_mode {
        run_ipc_loop(&mut ctx)
    } else {
        run_text_loop(&mut ctx)
    }
}

fn run_ipc_loop(ctx: &mut RunContext) -> Result<()> {
    let config = ctx.config;
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }
        if buffer.trim().is_empty() {
            continue;
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                reply_error(&mut stdout, &e.to_string(), false)?;
                continue;
            }
        };

        let outcome = match cmd {
            IpcCommand::Quit => break,
            IpcCommand::GetState => Ok(()),
            IpcCommand::Start { team } => ctx.set_team(&team),
            IpcCommand::Submit { round, choices } => {
                ctx.execute(PlayerCommand::Submit { round, choices }).map(|_| ())
            }
            IpcCommand::Reset => ctx.execute(PlayerCommand::Reset).map(|_| ()),
            IpcCommand::Dashboard { secret } => {
                let gate = AccessGate::new(config.instructor_secret.clone());
                if gate.authorize(Role::Instructor, Some(&secret)) {
                    let view = build_dashboard_for_run(config, ctx);
                    writeln!(stdout, "{}", serde_json::to_string(&view)?)?;
                    stdout.flush()?;
                    continue;
                }
                Err(SimError::Other(anyhow::anyhow!("Incorrect password")))
            }
        };

        match outcome {
            Ok(()) => match ctx.view() {
                Some(view) => writeln!(stdout, "{}", serde_json::to_string(&view)?)?,
                None => reply_error(&mut stdout, &SimError::MissingIdentity.to_string(), true)?,
            },
            Err(e) => reply_error(&mut stdout, &e.to_string(), e.is_rejection())?,
        }
        stdout.flush()?;
    }
    Ok(())
}

fn reply_error(stdout: &mut io::Stdout, message: &str, rejected: bool) -> Result<()> {
    let err_json = serde_json::json!({ "error": message, "rejected": rejected });
    writeln!(stdout, "{}", err_json)?;
    stdout.flush()?;
    Ok(())
}

fn run_text_loop(ctx: &mut RunContext) -> Result<()> {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut line = String::new();

    while ctx.team.is_none() {
        print!("Team name (or role, e.g. \"Team 2: IT\"): ");
        io::stdout().flush()?;
        line.clear();
        if input.read_line(&mut line)? == 0 {
            return Ok(());
        }
        if let Err(e) = ctx.set_team(&line) {
            println!("{e}");
        }
    }

    loop {
        let Some(view) = ctx.view() else { break };
        print!("{}", render::screen(&view));
        if view.summary.is_some() {
            println!("\nType 'reset' to play again or 'quit' to leave.");
        } else {
            println!("\nEnter one choice per decision separated by ';' ('reset' or 'quit' also work).");
        }
        print!("> ");
        io::stdout().flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let command = match line.trim() {
            "" => continue,
            "quit" | "exit" => break,
            "reset" => PlayerCommand::Reset,
            choices => PlayerCommand::Submit {
                round: view.round,
                choices: choices.split(';').map(|c| c.trim().to_string()).collect(),
            },
        };
        let submitted = matches!(command, PlayerCommand::Submit { .. });

        match ctx.execute(command) {
            Ok(events) => {
                for event in &events {
                    print_event(event);
                }
                if let Some(concept) = ctx.department.filter(|_| submitted).and_then(render::insight) {
                    println!("\n{concept}");
                }
            }
            Err(e) => println!("\n!! {e}"),
        }
        println!();
    }
    Ok(())
}

fn print_event(event: &SimEvent) {
    match event {
        SimEvent::DecisionSubmitted { summary, cost, .. } => {
            println!("\nDecisions submitted: {summary} (cost {})", render::money(*cost));
        }
        SimEvent::ScenarioDrawn { scenario, forced, .. } => {
            if *forced {
                println!("Your earlier compliance choice has consequences: {scenario}!");
            } else {
                println!("A new scenario emerges: {scenario}!");
            }
        }
        SimEvent::SessionReset { .. } => println!("\nSession reset."),
        _ => {}
    }
}

/// Dashboard over `--source`, the configured source, or `--db`.
fn build_dashboard(config: &SimConfig, args: &[String]) -> InstructorDashboard {
    let location = string_arg(args, "--source")
        .or(config.snapshot_source.as_deref())
        .or_else(|| string_arg(args, "--db"));
    let rows = match location {
        Some(location) => {
            let source = dashboard::source_for(location, string_arg(args, "--run-id"));
            dashboard::load_snapshot(source.as_ref())
        }
        None => {
            log::warn!("no snapshot source configured");
            Vec::new()
        }
    };
    InstructorDashboard::build(rows, &config.discussion_triggers)
}

/// Dashboard over this run's own decision log (IPC mode).
fn build_dashboard_for_run(config: &SimConfig, ctx: &RunContext) -> InstructorDashboard {
    let rows = match ctx.store.as_ref() {
        Some(store) => store
            .decision_rows(Some(&ctx.engine.run_id))
            .unwrap_or_else(|e| {
                log::warn!("decision log unavailable: {e}");
                Vec::new()
            }),
        None => match config.snapshot_source.as_deref() {
            Some(location) => {
                let source = dashboard::source_for(location, None);
                dashboard::load_snapshot(source.as_ref())
            }
            None => Vec::new(),
        },
    };
    InstructorDashboard::build(rows, &config.discussion_triggers)
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn has_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|a| a == flag)
}
