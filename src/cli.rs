use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::error::Error;
use std::future::Future;
use std::io::Write;
use std::io::{stdin, stdout};
use std::time::Duration;

use crate::app::card_matcher::CardMatcher;
use crate::app::{DraftSession, LandOutcome, LoadingFlag};
use crate::context::AppContext;
use crate::models::card::Card;
use crate::opt::*;

mod render;

const LOADING_TICK: Duration = Duration::from_millis(500);

fn log(s: String) {
    log_if(s.as_str(), DbgFlg::Cli);
}

/// Drives `work` to completion, printing a dot on every tick the session
/// reports it is waiting on the card service.
async fn waiting<F: Future>(loading: LoadingFlag, work: F) -> F::Output {
    tokio::pin!(work);
    let mut ticker = tokio::time::interval(LOADING_TICK);
    ticker.tick().await;
    let mut dots = false;

    let output = loop {
        tokio::select! {
            output = &mut work => break output,
            _ = ticker.tick() => {
                if loading.is_set() {
                    dots = true;
                    print!(".");
                    stdout().flush().ok();
                }
            }
        }
    };
    if dots {
        println!();
    }
    output
}

pub async fn main(session: &mut DraftSession, context: &AppContext) -> Result<(), Box<dyn Error>> {
    writeln!(stdout(), "Draft {} ready. Type `help` for commands.", session.id())?;
    let loaded = waiting(session.loading_flag(), session.load_commander_candidates()).await;
    show(loaded.map(|_| render::commanders(session.commander_candidates(), session.state())))?;
    report_error(session)?;

    loop {
        let line = readline()?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match respond(session, context, line).await {
            Ok(quit) => {
                if quit {
                    break;
                }
            }
            Err(err) => {
                write!(stdout(), "{err}")?;
                stdout().flush()?;
            }
        }
    }

    Ok(())
}

fn show(output: Res<String>) -> Result<(), Box<dyn Error>> {
    match output {
        Ok(text) => writeln!(stdout(), "{}", text)?,
        Err(err) => writeln!(stdout(), "error: {}", err)?,
    }
    stdout().flush()?;
    Ok(())
}

fn report_error(session: &DraftSession) -> Result<(), Box<dyn Error>> {
    if let Some(err) = session.last_error() {
        writeln!(stdout(), "{}", render::error_hint(err))?;
        stdout().flush()?;
    }
    Ok(())
}

/// Joined free-text argument, e.g. a card name typed without quotes.
fn text_arg(matches: &ArgMatches, id: &str) -> String {
    matches
        .get_many::<String>(id)
        .map(|words| words.cloned().collect::<Vec<String>>().join(" "))
        .unwrap_or_default()
}

/// A one-based position or a card name among `cards`.
fn resolve(cards: &[Card], query: &str) -> Res<usize> {
    if let Ok(position) = query.parse::<usize>() {
        if position == 0 || position > cards.len() {
            return Err(format!("choose a number from 1 to {}", cards.len()));
        }
        return Ok(position - 1);
    }

    let card = CardMatcher::new(cards)
        .find(query)
        .ok_or_else(|| format!("no card matching \"{}\"", query))?;
    log(format!("Resolved \"{}\" to {}", query, card.name));
    cards
        .iter()
        .position(|candidate| candidate.id == card.id)
        .ok_or_else(|| format!("no card matching \"{}\"", query))
}

async fn respond(
    session: &mut DraftSession,
    context: &AppContext,
    line: &str,
) -> Result<bool, Box<dyn Error>> {
    let args = shlex::split(line).ok_or("error: Invalid quoting")?;
    let matches = cli().try_get_matches_from(args)?;
    match matches.subcommand() {
        Some(("commanders", _matches)) => {
            if session.commander_candidates().is_empty() && !session.state().is_commander_selected {
                writeln!(stdout(), "Loading commanders ...")?;
                stdout().flush()?;
                let loaded =
                    waiting(session.loading_flag(), session.load_commander_candidates()).await;
                if let Err(err) = loaded {
                    show(Err(err))?;
                }
            }
            show(Ok(render::commanders(
                session.commander_candidates(),
                session.state(),
            )))?;
        }
        Some(("reroll", _matches)) => {
            let rerolled = waiting(session.loading_flag(), session.reroll_commanders()).await;
            let output = rerolled.map(|_| {
                render::commanders(session.commander_candidates(), session.state())
            });
            show(output)?;
        }
        Some(("commander", matches)) => {
            let query = text_arg(matches, "card");
            let index = resolve(session.commander_candidates(), &query);
            match index {
                Ok(index) => {
                    writeln!(stdout(), "Loading the card pool ...")?;
                    stdout().flush()?;
                    let chosen =
                        waiting(session.loading_flag(), session.choose_commander(index)).await;
                    let output = chosen.map(|commander| {
                        format!(
                            "Commander: {}\n\n{}",
                            commander.name,
                            render::offer(session.state())
                        )
                    });
                    show(output)?;
                }
                Err(err) => show(Err(err))?,
            }
        }
        Some(("pick", matches)) => {
            let query = text_arg(matches, "card");
            let index = resolve(&session.state().current_pick, &query);
            let output = match index {
                Ok(index) => waiting(session.loading_flag(), session.pick(index))
                    .await
                    .map(|card| {
                        format!("Picked {}.\n\n{}", card.name, render::offer(session.state()))
                    }),
                Err(err) => Err(err),
            };
            show(output)?;
        }
        Some(("lands", _matches)) => {
            let lands = waiting(session.loading_flag(), session.basic_lands()).await;
            let output = lands.map(|lands| {
                render::numbered(&lands, render::CardView::of(session.state()))
            });
            show(output)?;
        }
        Some(("land", matches)) => {
            let query = text_arg(matches, "card");
            let lands = waiting(session.loading_flag(), session.basic_lands()).await;
            let output = match lands {
                Ok(lands) => match resolve(&lands, &query) {
                    Ok(index) => session
                        .add_basic_land(lands[index].clone())
                        .map(|outcome| match outcome {
                            LandOutcome::Added(land) => format!(
                                "Added {} ({} lands).",
                                land.name,
                                session.state().land_count()
                            ),
                            LandOutcome::SwapProposed { remove, land } => {
                                render::swap_prompt(&remove, &land)
                            }
                        }),
                    Err(err) => Err(err),
                },
                Err(err) => Err(err),
            };
            show(output)?;
        }
        Some(("confirm", _matches)) => {
            let output = session
                .confirm_land_swap()
                .map(|(removed, added)| format!("Replaced {} with {}.", removed.name, added.name));
            show(output)?;
        }
        Some(("cancel", _matches)) => {
            session.cancel_land_swap();
            show(Ok("Land swap cancelled.".to_string()))?;
        }
        Some(("landcount", matches)) => {
            let count = matches.get_one::<i64>("count").copied().unwrap_or_default();
            let count = session.set_desired_land_count(count);
            context.set_desired_land_count(count)?;
            show(Ok(format!("Aiming for {} lands.", count)))?;
        }
        Some(("stats", _matches)) => {
            show(Ok(render::stats(&session.stats())))?;
        }
        Some(("deck", _matches)) => {
            show(Ok(render::deck(session.state(), session.land_swap())))?;
        }
        Some(("offer", _matches)) => {
            show(Ok(render::offer(session.state())))?;
        }
        Some(("export", _matches)) => {
            show(Ok(session.export()))?;
        }
        Some(("rank", _matches)) => {
            let shown = session.toggle_edhrec_rank();
            context.set_show_edhrec_rank(shown)?;
            show(Ok(format!(
                "EDHREC rank {}.",
                if shown { "shown" } else { "hidden" }
            )))?;
        }
        Some(("debug", _matches)) => {
            let shown = session.toggle_debug_info();
            let output = if shown {
                format!("Debug info shown.\n{:#?}", session.policy())
            } else {
                "Debug info hidden.".to_string()
            };
            show(Ok(output))?;
        }
        Some(("retry", _matches)) => {
            let retried = waiting(session.loading_flag(), session.retry()).await;
            show(retried.map(|_| "Done.".to_string()))?;
        }
        Some(("quit", _matches)) => {
            writeln!(stdout(), "Exiting ...")?;
            stdout().flush()?;
            return Ok(true);
        }
        Some((name, _matches)) => {
            return Err(format!("error: Unknown command {}", name).into());
        }
        None => unreachable!("subcommand required"),
    }

    report_error(session)?;
    Ok(false)
}

fn card_arg() -> Arg {
    Arg::new("card")
        .required(true)
        .num_args(1..)
        .action(ArgAction::Append)
        .help("Position in the list or card name")
}

fn cli() -> Command {
    // strip out usage
    const PARSER_TEMPLATE: &str = "\
        {all-args}
    ";
    // strip out name/version
    const COMMAND_TEMPLATE: &str = "\
        {about-with-newline}\n\
        {usage-heading}\n    {usage}\n\
        \n\
        {all-args}{after-help}\
    ";

    let simple = [
        ("commanders", "Show the commander candidates"),
        ("reroll", "Replace the commander candidates"),
        ("lands", "List the basic lands for this commander"),
        ("confirm", "Confirm the pending land swap"),
        ("cancel", "Cancel the pending land swap"),
        ("stats", "Show deck statistics"),
        ("deck", "Show the deck"),
        ("offer", "Show the current pick"),
        ("export", "Print the decklist"),
        ("rank", "Toggle EDHREC rank display"),
        ("debug", "Toggle debug information"),
        ("retry", "Retry the last failed request"),
    ];

    let mut cmd = Command::new("repl")
        .multicall(true)
        .arg_required_else_help(true)
        .subcommand_required(true)
        .subcommand_value_name("COMMAND")
        .subcommand_help_heading("COMMANDS")
        .help_template(PARSER_TEMPLATE)
        .subcommand(
            Command::new("commander")
                .about("Choose a commander")
                .arg(card_arg())
                .help_template(COMMAND_TEMPLATE),
        )
        .subcommand(
            Command::new("pick")
                .alias("p")
                .about("Pick a card from the current offer")
                .arg(card_arg())
                .help_template(COMMAND_TEMPLATE),
        )
        .subcommand(
            Command::new("land")
                .about("Add a basic land")
                .arg(card_arg())
                .help_template(COMMAND_TEMPLATE),
        )
        .subcommand(
            Command::new("landcount")
                .about("Set the desired number of lands")
                .arg(
                    Arg::new("count")
                        .required(true)
                        .allow_negative_numbers(true)
                        .value_parser(value_parser!(i64)),
                )
                .help_template(COMMAND_TEMPLATE),
        )
        .subcommand(
            Command::new("quit")
                .alias("exit")
                .alias("q")
                .alias(":q")
                .about("Quit the REPL")
                .help_template(COMMAND_TEMPLATE),
        );

    for (name, about) in simple {
        cmd = cmd.subcommand(
            Command::new(name)
                .about(about)
                .help_template(COMMAND_TEMPLATE),
        );
    }

    cmd
}

fn readline() -> Result<String, Box<dyn Error>> {
    write!(stdout(), "> ")?;
    stdout().flush()?;
    let mut buffer = String::new();
    stdin().read_line(&mut buffer)?;
    Ok(buffer)
}
