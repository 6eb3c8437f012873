use anyhow::Result;
use attendance_sdk::{NewPerson, PeopleApi, Person};
use clap::{Args, Subcommand};

use super::{api_failure, require_session};
use crate::context::AppContext;

#[derive(Args)]
pub struct PeopleArgs {
    #[command(subcommand)]
    command: PeopleCommand,
}

#[derive(Subcommand)]
enum PeopleCommand {
    /// List everyone
    List,
    /// Case-insensitive search over names, phone and address
    Search { query: String },
    /// Show one person
    Show { id: String },
    /// Add a person
    Add(AddPersonArgs),
}

#[derive(Args)]
struct AddPersonArgs {
    #[arg(long)]
    name: String,
    #[arg(long)]
    surname: String,
    #[arg(long)]
    family_name: String,
    #[arg(long)]
    cellphone: String,
    #[arg(long)]
    address: String,
}

impl PeopleArgs {
    pub async fn run(self, ctx: &AppContext) -> Result<()> {
        require_session(ctx)?;
        let people = &ctx.people;

        match self.command {
            PeopleCommand::List => print_people(&people.list().await.map_err(api_failure)?),
            PeopleCommand::Search { query } => {
                print_people(&people.search(&query).await.map_err(api_failure)?);
            }
            PeopleCommand::Show { id } => match people.get_by_id(&id).await.map_err(api_failure)? {
                Some(person) => print_person(&person),
                None => anyhow::bail!("No person with id {id}"),
            },
            PeopleCommand::Add(args) => {
                let new = NewPerson {
                    surname: args.surname,
                    family_name: args.family_name,
                    name: args.name,
                    cellphone: args.cellphone,
                    address: args.address,
                };
                let person = people.create(&new).await.map_err(api_failure)?;
                if person.id.is_empty() {
                    println!("Added {} {}", person.name, person.surname);
                } else {
                    println!("Added {} {} (id {})", person.name, person.surname, person.id);
                }
            }
        }
        Ok(())
    }
}

fn print_people(people: &[Person]) {
    if people.is_empty() {
        println!("No people found");
        return;
    }
    for p in people {
        println!(
            "{:<6} {:<20} {:<20} {:<16} {}",
            p.id,
            p.name,
            full_surname(p),
            p.cellphone,
            p.address
        );
    }
}

fn print_person(p: &Person) {
    println!("id:          {}", p.id);
    println!("name:        {}", p.name);
    println!("surname:     {}", p.surname);
    println!("family name: {}", p.family_name);
    println!("cellphone:   {}", p.cellphone);
    println!("address:     {}", p.address);
}

fn full_surname(p: &Person) -> String {
    if p.family_name.is_empty() {
        p.surname.clone()
    } else {
        format!("{} {}", p.surname, p.family_name)
    }
}
