//! Terminal shell: stdin/stdout front end over [`App`].
//!
//! One command per line. The shell keeps the screen-local form state
//! (wizards, plan form, last evaluation, listed suggestions) and prints the
//! user-facing message of every failure.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::api::{CycleEnergy, PlanCategory};
use crate::app::App;
use crate::error::{Error, FlowError};
use crate::navigation::{Screen, Transition};
use crate::planning::{Evaluation, PlanEventForm, SlotChoice};
use crate::profile::WorkoutIntensity;
use crate::suggestions::{Suggestion, SuggestionAction};
use crate::timestamp;
use crate::wizard::{
    OnboardingQuiz, SYMPTOM_OPTIONS, WeeklyCheckInForm, Wizard, WizardMove,
};

/// One parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Help,
    Status,
    Quit,
    Back,
    New,
    Returning,
    Register {
        email: String,
        username: Option<String>,
    },
    Login(String),
    Quiz,
    Flo,
    Upload(PathBuf),
    Set(String),
    Toggle(String),
    Next,
    Prev,
    Finish,
    Energy(CycleEnergy),
    Skip,
    Summary,
    Suggest,
    Apply(usize),
    Connect,
    Weekly,
    Plan,
    Title(String),
    Category(PlanCategory),
    Start(DateTime<Utc>),
    Duration(f64),
    Evaluate,
    Book(SlotChoice),
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (word, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let need = |what: &str| -> Result<String, String> {
            if rest.is_empty() {
                Err(format!("Usage: {word} <{what}>"))
            } else {
                Ok(rest.to_string())
            }
        };

        let cmd = match word.to_ascii_lowercase().as_str() {
            "help" | "?" => Self::Help,
            "status" => Self::Status,
            "quit" | "exit" | "/quit" => Self::Quit,
            "back" | "cancel" => Self::Back,
            "new" => Self::New,
            "returning" => Self::Returning,
            "register" => {
                let args = need("email")?;
                let (email, name) = args
                    .split_once(char::is_whitespace)
                    .unwrap_or((args.as_str(), ""));
                let name = name.trim();
                Self::Register {
                    email: email.to_string(),
                    username: (!name.is_empty()).then(|| name.to_string()),
                }
            }
            "login" => Self::Login(need("email")?),
            "quiz" => Self::Quiz,
            "flo" => Self::Flo,
            "upload" => Self::Upload(PathBuf::from(need("path")?)),
            "set" => Self::Set(need("value")?),
            "toggle" => Self::Toggle(need("symptom")?),
            "next" => Self::Next,
            "prev" => Self::Prev,
            "finish" | "submit" => Self::Finish,
            "energy" => Self::Energy(need("stable|mixed|low|high")?.parse()?),
            "skip" => Self::Skip,
            "summary" => Self::Summary,
            "suggest" => Self::Suggest,
            "apply" => {
                let n: usize = need("number")?
                    .parse()
                    .map_err(|_| format!("Not a suggestion number: {rest}"))?;
                if n == 0 {
                    return Err("Suggestions are numbered from 1".to_string());
                }
                Self::Apply(n)
            }
            "connect" => Self::Connect,
            "weekly" => Self::Weekly,
            "plan" => Self::Plan,
            "title" => Self::Title(need("title")?),
            "category" => Self::Category(need("work|uni|social|sport")?.parse()?),
            "start" => Self::Start(
                timestamp::parse(&need("YYYY-MM-DDTHH:MM")?)
                    .ok_or_else(|| format!("Not a timestamp: {rest}"))?,
            ),
            "duration" => Self::Duration(
                need("hours")?
                    .parse()
                    .map_err(|_| format!("Not a number of hours: {rest}"))?,
            ),
            "evaluate" => Self::Evaluate,
            "book" => match need("original|suggested")?.to_ascii_lowercase().as_str() {
                "original" => Self::Book(SlotChoice::Original),
                "suggested" => Self::Book(SlotChoice::Suggested),
                _ => return Err(format!("Unknown slot: {rest}")),
            },
            "" => return Err("Empty command".to_string()),
            other => return Err(format!("Unknown command: {other}. Type 'help'.")),
        };
        Ok(cmd)
    }
}

fn affordances(screen: Screen) -> &'static str {
    match screen {
        Screen::Intro => "new | returning",
        Screen::Register => "register <email> [name] | back",
        Screen::Login => "login <email> | back",
        Screen::OnboardingChoice => "quiz | flo | back",
        Screen::OnboardingQuiz => "set <value> | toggle <symptom> | next | prev | finish | back",
        Screen::FloUpload => "upload <path to .json or .zip> | back",
        Screen::MonthlyQuiz => "energy <stable|mixed|low|high> | skip | back",
        Screen::Dashboard => "summary | suggest | apply <n> | connect | weekly | plan",
        Screen::WeeklyQuiz => "set <1-5> | next | prev | finish | back",
        Screen::PlanEvent => {
            "title <text> | category <c> | start <time> | duration <h> | evaluate | book original|suggested | back"
        }
    }
}

enum Flow {
    Continue,
    Quit,
}

pub struct Shell {
    app: Arc<App>,
    quiz: Wizard<OnboardingQuiz>,
    weekly: Wizard<WeeklyCheckInForm>,
    plan: PlanEventForm,
    evaluation: Option<Evaluation>,
    listed: Vec<Suggestion>,
}

impl Shell {
    pub fn new(app: Arc<App>) -> Self {
        Self {
            app,
            quiz: Wizard::new(OnboardingQuiz::default()),
            weekly: Wizard::new(WeeklyCheckInForm::default()),
            plan: PlanEventForm::default(),
            evaluation: None,
            listed: Vec::new(),
        }
    }

    /// Read commands until EOF or `quit`.
    pub async fn run(mut self) -> std::io::Result<()> {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        self.show_screen().await;

        loop {
            eprint!("> ");
            let Some(line) = lines.next_line().await? else {
                break;
            };
            if line.trim().is_empty() {
                continue;
            }
            let command = match Command::parse(&line) {
                Ok(c) => c,
                Err(msg) => {
                    println!("{msg}");
                    continue;
                }
            };
            match self.execute(command).await {
                Ok(Flow::Quit) => break,
                Ok(Flow::Continue) => {}
                Err(e) => println!("! {}", e.user_message()),
            }
        }
        Ok(())
    }

    async fn show_screen(&self) {
        let screen = self.app.screen().await;
        println!("\n[{screen}]  {}", affordances(screen));
        match screen {
            Screen::OnboardingQuiz => self.show_quiz_step(),
            Screen::WeeklyQuiz => println!(
                "Step {}/{}: {} (1-5)",
                self.weekly.step(),
                self.weekly.total(),
                self.weekly.title()
            ),
            Screen::Dashboard => {
                let dashboard = self.app.dashboard();
                if let Some(notice) = dashboard.notice().await {
                    println!("{notice}");
                    dashboard.clear_notice().await;
                }
            }
            _ => {}
        }
    }

    fn show_quiz_step(&self) {
        println!(
            "Step {}/{}: {}",
            self.quiz.step(),
            self.quiz.total(),
            self.quiz.title()
        );
        if self.quiz.step() == 4 {
            println!("Options: {}", SYMPTOM_OPTIONS.join(", "));
        }
    }

    /// Reset screen-local state for the screen just entered.
    async fn entered(&mut self, transition: Transition) {
        if transition.from != transition.to {
            match transition.to {
                Screen::OnboardingQuiz => self.quiz = Wizard::new(OnboardingQuiz::default()),
                Screen::WeeklyQuiz => self.weekly = Wizard::new(WeeklyCheckInForm::default()),
                Screen::PlanEvent => {
                    self.plan = PlanEventForm::default();
                    self.evaluation = None;
                }
                _ => {}
            }
        }
        self.show_screen().await;
    }

    async fn execute(&mut self, command: Command) -> Result<Flow, Error> {
        let app = self.app.clone();
        let screen = app.screen().await;

        let transition = match command {
            Command::Quit => return Ok(Flow::Quit),
            Command::Help => {
                println!("{}", affordances(screen));
                return Ok(Flow::Continue);
            }
            Command::Status => {
                self.print_status().await;
                return Ok(Flow::Continue);
            }
            Command::Back => app.back().await?,
            Command::New => app.first_time().await?,
            Command::Returning => app.returning().await?,
            Command::Register { email, username } => {
                app.register(&email, username.as_deref()).await?
            }
            Command::Login(email) => app.login(&email).await?,
            Command::Quiz => app.choose_quiz().await?,
            Command::Flo => app.choose_flo_upload().await?,
            Command::Upload(path) => app.import_flo(&path).await?,
            Command::Set(value) => {
                self.set_value(screen, &value)?;
                return Ok(Flow::Continue);
            }
            Command::Toggle(symptom) => {
                expect(screen, Screen::OnboardingQuiz, "toggle")?;
                let on = self.quiz.form_mut().symptoms.toggle(&symptom);
                println!("{symptom}: {}", if on { "selected" } else { "removed" });
                return Ok(Flow::Continue);
            }
            Command::Next => {
                match screen {
                    Screen::OnboardingQuiz => {
                        self.quiz.next()?;
                        self.show_quiz_step();
                    }
                    Screen::WeeklyQuiz => {
                        self.weekly.next()?;
                        self.show_screen().await;
                    }
                    other => return Err(not_here(other, "next")),
                }
                return Ok(Flow::Continue);
            }
            Command::Prev => {
                let moved = match screen {
                    Screen::OnboardingQuiz => self.quiz.prev(),
                    Screen::WeeklyQuiz => self.weekly.prev(),
                    other => return Err(not_here(other, "prev")),
                };
                match moved {
                    WizardMove::Exit => app.back().await?,
                    WizardMove::Step(_) => {
                        self.show_screen().await;
                        return Ok(Flow::Continue);
                    }
                }
            }
            Command::Finish => match screen {
                Screen::OnboardingQuiz => {
                    let payload = self.quiz.finish()?;
                    app.submit_onboarding(&payload).await?
                }
                Screen::WeeklyQuiz => {
                    let answers = self.weekly.finish()?;
                    app.submit_weekly_checkin(&answers).await?
                }
                other => return Err(not_here(other, "finish")),
            },
            Command::Energy(energy) => app.submit_monthly_checkin(energy).await?,
            Command::Skip => app.skip_monthly_checkin().await?,
            Command::Summary => {
                expect(screen, Screen::Dashboard, "summary")?;
                app.load_summary().await?;
                self.print_summary().await;
                return Ok(Flow::Continue);
            }
            Command::Suggest => {
                expect(screen, Screen::Dashboard, "suggest")?;
                println!("Asking the planning agent...");
                let result = app.refresh_suggestions().await;
                self.listed = app.dashboard().engine().suggestions().await;
                result?;
                self.print_suggestions();
                return Ok(Flow::Continue);
            }
            Command::Apply(n) => {
                expect(screen, Screen::Dashboard, "apply")?;
                let Some(suggestion) = self.listed.get(n - 1).cloned() else {
                    println!("No suggestion #{n}. Run 'suggest' first.");
                    return Ok(Flow::Continue);
                };
                app.apply_suggestion(&suggestion).await?;
                self.listed = app.dashboard().engine().suggestions().await;
                self.show_screen().await;
                self.print_suggestions();
                return Ok(Flow::Continue);
            }
            Command::Connect => {
                expect(screen, Screen::Dashboard, "connect")?;
                let url = app.connect_calendar().await?;
                println!("Open this link to connect your calendar:\n  {url}");
                println!("Afterwards restart with the URL you were sent back to.");
                return Ok(Flow::Continue);
            }
            Command::Weekly => app.open_weekly_checkin().await?,
            Command::Plan => app.open_plan_event().await?,
            Command::Title(title) => {
                expect(screen, Screen::PlanEvent, "title")?;
                self.plan.title = title;
                return Ok(Flow::Continue);
            }
            Command::Category(category) => {
                expect(screen, Screen::PlanEvent, "category")?;
                self.plan.category = category;
                return Ok(Flow::Continue);
            }
            Command::Start(start) => {
                expect(screen, Screen::PlanEvent, "start")?;
                self.plan.start = Some(start);
                return Ok(Flow::Continue);
            }
            Command::Duration(hours) => {
                expect(screen, Screen::PlanEvent, "duration")?;
                self.plan.duration_hours = hours;
                return Ok(Flow::Continue);
            }
            Command::Evaluate => {
                let evaluation = app.evaluate_plan(&self.plan).await?;
                print_evaluation(&evaluation);
                self.evaluation = Some(evaluation);
                return Ok(Flow::Continue);
            }
            Command::Book(choice) => {
                let Some(evaluation) = self.evaluation.clone() else {
                    println!("Run 'evaluate' first.");
                    return Ok(Flow::Continue);
                };
                let (created, transition) = app.schedule_plan(&evaluation, choice).await?;
                println!("Event created ({}).", created.event_id);
                transition
            }
        };

        self.entered(transition).await;
        Ok(Flow::Continue)
    }

    fn set_value(&mut self, screen: Screen, value: &str) -> Result<(), Error> {
        let invalid = |step: usize, field: &str| FlowError::ValidationIncomplete {
            step,
            field: field.to_string(),
        };
        match screen {
            Screen::OnboardingQuiz => {
                let step = self.quiz.step();
                let form = self.quiz.form_mut();
                match step {
                    1 => {
                        form.last_period_start = Some(
                            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                                .map_err(|_| invalid(1, "a date as YYYY-MM-DD"))?,
                        )
                    }
                    2 => {
                        form.cycle_length =
                            Some(value.parse().map_err(|_| invalid(2, "a number of days"))?)
                    }
                    3 => {
                        form.menstruation_phase_duration =
                            Some(value.parse().map_err(|_| invalid(3, "a number of days"))?)
                    }
                    4 => {
                        form.symptoms.toggle(value);
                    }
                    5 => form.medication = value.to_string(),
                    _ => {
                        form.workout_intensity = Some(
                            value
                                .parse::<WorkoutIntensity>()
                                .map_err(|_| invalid(6, "low, medium or high"))?,
                        )
                    }
                }
                Ok(())
            }
            Screen::WeeklyQuiz => {
                let step = self.weekly.step();
                let level: u8 = value
                    .parse()
                    .map_err(|_| invalid(step, "a level from 1 to 5"))?;
                self.weekly.form_mut().set_level(step, level)?;
                Ok(())
            }
            other => Err(not_here(other, "set")),
        }
    }

    async fn print_status(&self) {
        let session = self.app.session().await;
        println!("screen: {}", session.current_screen());
        match session.user() {
            Some(user) => println!("user: {}", user.display_name()),
            None => println!("user: (none)"),
        }
        println!("calendar connected: {}", session.calendar_connected());
    }

    async fn print_summary(&self) {
        let Some(summary) = self.app.dashboard().summary().await else {
            return;
        };
        println!(
            "Cycle day {} - {}\n{}",
            summary.cycle_day, summary.phase_label, summary.tips.headline
        );
        if !summary.tips.do_list.is_empty() {
            println!("  Do: {}", summary.tips.do_list.join(", "));
        }
        if !summary.tips.avoid.is_empty() {
            println!("  Avoid: {}", summary.tips.avoid.join(", "));
        }
    }

    fn print_suggestions(&self) {
        let engine = self.app.dashboard().engine();
        for (i, s) in self.listed.iter().enumerate() {
            let when = match (s.action, s.new_start) {
                (SuggestionAction::Move, Some(start)) => format!(" -> {}", start.format("%a %d %b %H:%M")),
                _ => String::new(),
            };
            let marker = if engine.is_applicable(s) { "" } else { " (info)" };
            println!("{:>2}. [{}] {}{}{}", i + 1, s.action, s.event_title, when, marker);
            if !s.reason.is_empty() {
                println!("      {}", s.reason);
            }
        }
    }
}

fn print_evaluation(evaluation: &Evaluation) {
    let s = &evaluation.suggestion;
    if s.is_ideal {
        println!("Good timing. {}", s.reason);
    } else {
        println!("{}", s.reason);
    }
    match s.suggested_start {
        Some(start) => println!(
            "Suggested: {} ({}). book original|suggested",
            start.format("%a %d %b %H:%M"),
            s.suggested_phase.as_deref().unwrap_or("better phase")
        ),
        None => println!("book original"),
    }
}

fn not_here(screen: Screen, action: &str) -> Error {
    FlowError::InvalidTransition {
        from: screen.to_string(),
        event: action.to_string(),
    }
    .into()
}

fn expect(screen: Screen, wanted: Screen, action: &str) -> Result<(), Error> {
    if screen == wanted {
        Ok(())
    } else {
        Err(not_here(screen, action))
    }
}
