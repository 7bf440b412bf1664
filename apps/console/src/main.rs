use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use client_core::{ClientConfig, ClientError, CrudClient, Route};
use serde_json::{Map, Value};
use shared::domain::{Entity, EntityId, Person, Task};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "crud-console", about = "Browse and edit the people and tasks collections")]
struct Cli {
    /// Overrides `base_url` from the config file and environment.
    #[arg(long, global = true)]
    base_url: Option<String>,
    /// Client settings file; defaults to `crud-client.toml` when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    #[command(subcommand)]
    People(PeopleCommand),
    #[command(subcommand)]
    Tasks(TasksCommand),
    /// Renders the screen for an app path such as `/people` or `/edit-task/3`.
    Open { path: String },
}

#[derive(Subcommand, Debug)]
enum PeopleCommand {
    List,
    Show {
        id: EntityId,
    },
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        age: u32,
        #[arg(long)]
        email: String,
    },
    /// Loads the person, applies the given fields and saves the full record.
    Edit {
        id: EntityId,
        #[command(flatten)]
        changes: PersonChanges,
    },
    Patch {
        id: EntityId,
        #[command(flatten)]
        fields: Assignments,
    },
    Delete {
        id: EntityId,
    },
}

#[derive(Subcommand, Debug)]
enum TasksCommand {
    List,
    Show {
        id: EntityId,
    },
    Add {
        #[command(flatten)]
        fields: Assignments,
    },
    Edit {
        id: EntityId,
        #[command(flatten)]
        fields: Assignments,
    },
    Patch {
        id: EntityId,
        #[command(flatten)]
        fields: Assignments,
    },
    Delete {
        id: EntityId,
    },
}

#[derive(Args, Debug)]
struct PersonChanges {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    age: Option<u32>,
    #[arg(long)]
    email: Option<String>,
}

#[derive(Args, Debug)]
struct Assignments {
    /// `key=value`; the value is read as JSON and falls back to a plain string.
    #[arg(long = "set", value_parser = parse_assignment)]
    set: Vec<(String, Value)>,
}

impl Assignments {
    /// Drops any `id` assignment; the record id comes from the command line.
    fn into_map(self) -> Map<String, Value> {
        self.set.into_iter().filter(|(key, _)| key != "id").collect()
    }
}

fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing field name in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = ClientConfig::load(cli.config.as_deref())?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    let client = CrudClient::new(config)?;

    if let Err(err) = run(&client, cli.command).await {
        if let Some(fields) = err
            .downcast_ref::<ClientError>()
            .and_then(ClientError::field_errors)
        {
            for (field, messages) in fields {
                eprintln!("  {field}: {}", messages.join(" "));
            }
        }
        return Err(err);
    }
    Ok(())
}

async fn run(client: &CrudClient, command: Command) -> Result<()> {
    match command {
        Command::Open { path } => {
            let route = Route::resolve(&path);
            if Route::parse(&path).is_none() {
                warn!(%path, %route, "unknown path, redirecting");
            }
            render(client, route).await
        }
        Command::People(command) => people(client, command).await,
        Command::Tasks(command) => tasks(client, command).await,
    }
}

async fn people(client: &CrudClient, command: PeopleCommand) -> Result<()> {
    match command {
        PeopleCommand::List => render(client, Route::list_of::<Person>()).await,
        PeopleCommand::Show { id } => render(client, Route::edit_of::<Person>(id)).await,
        PeopleCommand::Add { name, age, email } => {
            save_form::<Person>(client, None, |person| {
                *person = Person::new(name, age, email);
            })
            .await
        }
        PeopleCommand::Edit { id, changes } => {
            save_form::<Person>(client, Some(id), |person| {
                if let Some(name) = changes.name {
                    person.name = name;
                }
                if let Some(age) = changes.age {
                    person.age = age;
                }
                if let Some(email) = changes.email {
                    person.email = email;
                }
            })
            .await
        }
        PeopleCommand::Patch { id, fields } => patch::<Person>(client, id, fields).await,
        PeopleCommand::Delete { id } => delete::<Person>(client, id).await,
    }
}

async fn tasks(client: &CrudClient, command: TasksCommand) -> Result<()> {
    match command {
        TasksCommand::List => render(client, Route::list_of::<Task>()).await,
        TasksCommand::Show { id } => render(client, Route::edit_of::<Task>(id)).await,
        TasksCommand::Add { fields } => {
            save_form::<Task>(client, None, |task| task.fields = fields.into_map()).await
        }
        TasksCommand::Edit { id, fields } => {
            save_form::<Task>(client, Some(id), |task| task.fields.extend(fields.into_map())).await
        }
        TasksCommand::Patch { id, fields } => patch::<Task>(client, id, fields).await,
        TasksCommand::Delete { id } => delete::<Task>(client, id).await,
    }
}

/// Draws the screen a route names. Routes only ever carry known resources.
async fn render(client: &CrudClient, route: Route) -> Result<()> {
    println!("== {route}");
    match (route, route.resource()) {
        (Route::List(_), Person::RESOURCE) => show_list::<Person>(client).await,
        (Route::List(_), Task::RESOURCE) => show_list::<Task>(client).await,
        (Route::Create(_), Person::RESOURCE) => show_form::<Person>(client, None).await,
        (Route::Create(_), Task::RESOURCE) => show_form::<Task>(client, None).await,
        (Route::Edit(_, id), Person::RESOURCE) => show_form::<Person>(client, Some(id)).await,
        (Route::Edit(_, id), Task::RESOURCE) => show_form::<Task>(client, Some(id)).await,
        (_, resource) => bail!("no screen for resource '{resource}'"),
    }
}

async fn show_list<T: Entity>(client: &CrudClient) -> Result<()> {
    let mut list = client.list_controller::<T>()?;
    let items = list.refresh().await?;
    if items.is_empty() {
        println!("(no {})", T::RESOURCE);
    }
    for item in items {
        print_entity(item)?;
    }
    Ok(())
}

async fn show_form<T: Entity>(client: &CrudClient, id: Option<EntityId>) -> Result<()> {
    let mut form = client.form_controller::<T>()?;
    form.init(id).await?;
    println!("{} form ({:?})", T::SINGULAR, form.state());
    print_entity(form.entity())
}

async fn save_form<T: Entity>(
    client: &CrudClient,
    id: Option<EntityId>,
    edit: impl FnOnce(&mut T),
) -> Result<()> {
    let mut form = client.form_controller::<T>()?;
    form.init(id).await?;
    edit(form.entity_mut());
    let outcome = form.save().await?;
    info!(resource = T::RESOURCE, id = %outcome.entity.id(), "saved");
    println!("saved {} {}", T::SINGULAR, outcome.entity.id());
    render(client, outcome.next).await
}

async fn patch<T: Entity>(client: &CrudClient, id: EntityId, fields: Assignments) -> Result<()> {
    let updated = client.resource::<T>()?.patch(id, fields.into_map()).await?;
    print_entity(&updated)
}

async fn delete<T: Entity>(client: &CrudClient, id: EntityId) -> Result<()> {
    let mut list = client.list_controller::<T>()?;
    let remaining = list.remove(id).await?.len();
    println!("deleted {} {id}, {remaining} left", T::SINGULAR);
    Ok(())
}

fn print_entity<T: Entity>(entity: &T) -> Result<()> {
    println!("{}", serde_json::to_string(entity)?);
    Ok(())
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
