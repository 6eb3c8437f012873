use std::collections::HashSet;

use anyhow::Result;
use attendance_sdk::{AttendanceApi, AttendanceRecord, PeopleApi};
use clap::{Args, Subcommand};

use super::{DateArgs, api_failure, require_session};
use crate::context::AppContext;

#[derive(Args)]
pub struct AttendanceArgs {
    #[command(subcommand)]
    command: AttendanceCommand,
}

#[derive(Subcommand)]
enum AttendanceCommand {
    /// Show everyone's status for a day
    List(DateArgs),
    /// Mark one person present or absent
    Mark(MarkArgs),
    /// Record a whole day: listed people present, everyone else absent
    Submit(SubmitArgs),
    /// Present/absent counts for a day
    Stats(DateArgs),
}

#[derive(Args)]
struct MarkArgs {
    person_id: String,
    #[command(flatten)]
    date: DateArgs,
    #[arg(long, conflicts_with = "absent", required_unless_present = "absent")]
    present: bool,
    #[arg(long)]
    absent: bool,
}

#[derive(Args)]
struct SubmitArgs {
    #[command(flatten)]
    date: DateArgs,
    /// Ids of the people who attended
    #[arg(long, num_args = 0.., value_delimiter = ',')]
    present: Vec<String>,
}

impl AttendanceArgs {
    pub async fn run(self, ctx: &AppContext) -> Result<()> {
        require_session(ctx)?;
        let attendance = &ctx.attendance;

        match self.command {
            AttendanceCommand::List(date) => {
                let date = date.resolve();
                let records = attendance.get_by_date(date).await.map_err(api_failure)?;
                print_records(&records);
            }
            AttendanceCommand::Mark(args) => {
                let date = args.date.resolve();
                let ok = attendance
                    .mark_one(&args.person_id, date, args.present)
                    .await
                    .map_err(api_failure)?;
                if !ok {
                    anyhow::bail!("The server did not accept the attendance mark");
                }
                let status = if args.present { "present" } else { "absent" };
                println!("Marked {} {status} on {date}", args.person_id);
            }
            AttendanceCommand::Submit(args) => {
                let date = args.date.resolve();
                let present: HashSet<&str> = args.present.iter().map(String::as_str).collect();
                let people = ctx.people.list().await.map_err(api_failure)?;

                if let Some(unknown) = present
                    .iter()
                    .find(|id| !people.iter().any(|p| p.id == **id))
                {
                    anyhow::bail!("No person with id {unknown}");
                }

                let records: Vec<_> = people
                    .iter()
                    .map(|p| AttendanceRecord::for_person(p, date, present.contains(p.id.as_str())))
                    .collect();
                let ok = attendance.post_batch(&records).await.map_err(api_failure)?;
                if !ok {
                    anyhow::bail!("The server did not accept the attendance sheet");
                }
                println!(
                    "Recorded {date}: {} present, {} absent",
                    present.len(),
                    records.len() - present.len()
                );
            }
            AttendanceCommand::Stats(date) => {
                let date = date.resolve();
                let stats = attendance.get_stats(date).await.map_err(api_failure)?;
                println!("Date:     {date}");
                println!("Attended: {}", stats.attended);
                println!("Absent:   {}", stats.absent);
                println!("Total:    {}", stats.total());
            }
        }
        Ok(())
    }
}

fn print_records(records: &[AttendanceRecord]) {
    if records.is_empty() {
        println!("No attendance records");
        return;
    }
    for r in records {
        let status = match r.attendance {
            Some(true) => "present",
            Some(false) => "absent",
            None => "-",
        };
        println!(
            "{:<6} {:<20} {:<20} {status}",
            r.person_id, r.name, r.surname
        );
    }
}
