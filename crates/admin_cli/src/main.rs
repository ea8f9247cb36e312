use std::error::Error;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use sea_orm::Database;

use engine::{ChargeFeesCmd, CollectPaymentCmd, DiscountCmd, Engine, OpeningBalanceCmd};
use migration::MigratorTrait;

#[derive(Parser, Debug)]
#[command(name = "shulk_admin")]
#[command(about = "Admin utilities for the shulk fee ledger")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./shulk.db?mode=rwc"
    )]
    database_url: String,

    /// Verbose engine logging.
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Student(Student),
    Session(Session),
    /// Generate fee charges for a student in a session.
    Charge(ChargeArgs),
    /// Collect a payment and print the receipt id.
    Collect(CollectArgs),
    /// Cancel a receipt (reverses its ledger effect).
    Cancel(CancelArgs),
    /// Credit a discount.
    Discount(DiscountArgs),
    /// Import a carried-forward opening balance.
    OpeningBalance(OpeningBalanceArgs),
    /// Print institution-wide dues.
    Dues(DuesArgs),
}

#[derive(Args, Debug)]
struct Student {
    #[command(subcommand)]
    command: StudentCommand,
}

#[derive(Subcommand, Debug)]
enum StudentCommand {
    Create(StudentCreateArgs),
    /// Delete a student and purge their whole ledger.
    Delete(StudentIdArgs),
    /// Print a student's ledger statement.
    Statement(StatementArgs),
}

#[derive(Args, Debug)]
struct StudentCreateArgs {
    #[arg(long)]
    name: String,
}

#[derive(Args, Debug)]
struct StudentIdArgs {
    #[arg(long)]
    id: i64,
}

#[derive(Args, Debug)]
struct StatementArgs {
    #[arg(long)]
    id: i64,
    /// Restrict to one session.
    #[arg(long)]
    session: Option<i64>,
    #[arg(long)]
    json: bool,
}

#[derive(Args, Debug)]
struct Session {
    #[command(subcommand)]
    command: SessionCommand,
}

#[derive(Subcommand, Debug)]
enum SessionCommand {
    Create(SessionCreateArgs),
}

#[derive(Args, Debug)]
struct SessionCreateArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    starts: NaiveDate,
    #[arg(long)]
    ends: NaiveDate,
}

#[derive(Args, Debug)]
struct ChargeArgs {
    #[arg(long)]
    student: i64,
    #[arg(long)]
    session: i64,
    #[arg(long)]
    on: NaiveDate,
    /// Fee head as "Particulars=amount", repeatable.
    #[arg(long = "line", value_parser = parse_fee_line, required = true)]
    lines: Vec<(String, i64)>,
}

#[derive(Args, Debug)]
struct CollectArgs {
    #[arg(long)]
    student: i64,
    #[arg(long)]
    session: i64,
    #[arg(long)]
    amount: i64,
    #[arg(long)]
    on: NaiveDate,
    #[arg(long)]
    note: Option<String>,
}

#[derive(Args, Debug)]
struct CancelArgs {
    #[arg(long)]
    receipt: i64,
}

#[derive(Args, Debug)]
struct DiscountArgs {
    #[arg(long)]
    student: i64,
    #[arg(long)]
    session: i64,
    #[arg(long)]
    amount: i64,
    #[arg(long)]
    on: NaiveDate,
    #[arg(long)]
    particulars: Option<String>,
}

#[derive(Args, Debug)]
struct OpeningBalanceArgs {
    #[arg(long)]
    student: i64,
    #[arg(long)]
    session: i64,
    #[arg(long)]
    amount: i64,
    /// Usually the session start date.
    #[arg(long)]
    as_of: NaiveDate,
}

#[derive(Args, Debug)]
struct DuesArgs {
    #[arg(long)]
    json: bool,
}

fn parse_fee_line(raw: &str) -> Result<(String, i64), String> {
    let (particulars, amount) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected \"Particulars=amount\", got {raw}"))?;
    let amount: i64 = amount
        .trim()
        .parse()
        .map_err(|_| format!("invalid amount in {raw}"))?;
    Ok((particulars.trim().to_string(), amount))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing_subscriber::filter::LevelFilter::DEBUG
    } else {
        tracing_subscriber::filter::LevelFilter::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let db = Database::connect(&cli.database_url).await?;
    migration::Migrator::up(&db, None).await?;
    let engine = Engine::builder().database(db).build().await?;

    match cli.command {
        Command::Student(student) => match student.command {
            StudentCommand::Create(args) => {
                let id = engine.new_student(&args.name).await?;
                println!("created student {id}");
            }
            StudentCommand::Delete(args) => {
                engine.delete_student(args.id).await?;
                println!("deleted student {} and purged their ledger", args.id);
            }
            StudentCommand::Statement(args) => {
                let student = engine.student(args.id).await?;
                let entries = engine.entries_for_student(args.id, args.session).await?;
                if args.json {
                    println!("{}", serde_json::to_string_pretty(&entries)?);
                } else {
                    println!("Statement for {} (#{})", student.name, student.id);
                    for entry in &entries {
                        println!(
                            "{} #{:<6} {:<24} dr {:>8} cr {:>8} bal {:>8}",
                            entry.entry_date,
                            entry.id,
                            entry.particulars,
                            entry.debit_minor,
                            entry.credit_minor,
                            entry.balance_minor
                        );
                    }
                    let balance = engine.current_balance(args.id).await?;
                    println!("current balance: {balance}");
                }
            }
        },
        Command::Session(session) => match session.command {
            SessionCommand::Create(args) => {
                let id = engine
                    .new_session(&args.name, args.starts, args.ends)
                    .await?;
                println!("created session {id}");
            }
        },
        Command::Charge(args) => {
            let mut cmd = ChargeFeesCmd::new(args.student, args.session, args.on);
            for (particulars, amount) in args.lines {
                cmd = cmd.line(particulars, amount);
            }
            let ids = engine.charge_fees(cmd).await?;
            println!("charged {} fee heads", ids.len());
        }
        Command::Collect(args) => {
            let mut cmd = CollectPaymentCmd::new(args.student, args.session, args.amount, args.on);
            if let Some(note) = args.note {
                cmd = cmd.note(note);
            }
            let outcome = engine.collect_payment(cmd).await?;
            println!(
                "receipt {} recorded, balance now {}",
                outcome.receipt_id, outcome.balance_minor
            );
        }
        Command::Cancel(args) => {
            let flagged = engine.cancel_receipt(args.receipt).await?;
            println!("cancelled receipt {}, reversed {flagged} entries", args.receipt);
        }
        Command::Discount(args) => {
            let mut cmd = DiscountCmd::new(args.student, args.session, args.amount, args.on);
            if let Some(particulars) = args.particulars {
                cmd = cmd.particulars(particulars);
            }
            engine.apply_discount(cmd).await?;
            println!("discount applied");
        }
        Command::OpeningBalance(args) => {
            engine
                .import_opening_balance(OpeningBalanceCmd::new(
                    args.student,
                    args.session,
                    args.amount,
                    args.as_of,
                ))
                .await?;
            println!("opening balance imported");
        }
        Command::Dues(args) => {
            let total = engine.total_pending_dues().await?;
            let defaulters = engine.student_ids_with_dues().await?;
            if args.json {
                let payload = serde_json::json!({
                    "total_pending_dues": total,
                    "students_with_dues": defaulters,
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("total pending dues: {total}");
                println!("students in arrears: {defaulters:?}");
            }
        }
    }

    Ok(())
}
