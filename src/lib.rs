pub mod calculator;
pub mod config;
pub mod display;
pub mod expr;
pub mod goal;
pub mod implicit;
pub mod lex;
pub mod naming;
pub mod node;
pub mod parse;
pub mod pattern;
pub mod session;

use anyhow::Context;

use crate::config::Config;
use crate::display::{Displayer, Format};
use crate::goal::Goal;
use crate::session::Session;

/// What to print and how.
#[derive(Debug, Clone, Default)]
pub struct Options {
    pub format: Format,
    pub text_depth: usize,
    pub config: Config,
    /// Properties already applied in the proof, shown apart in HTML.
    pub used_properties: Vec<String>,
}

/// Reads a goal from the prover's output and renders its context and target,
/// one entry per line. With `previous`, context entries are tagged with how
/// they changed since that goal.
pub fn process(
    options: &Options,
    context: &str,
    targets: &str,
    previous: Option<(&str, &str)>,
) -> anyhow::Result<String> {
    let mut session = Session::new(options.config.clone());
    let old = match previous {
        Some((context, targets)) => {
            let goal = parse::parse_goal(&mut session, context, targets)
                .context("cannot read the previous goal")?;
            session.name_goal(&goal)?;
            // identifiers are reused by the prover across states
            session.reset();
            Some(goal)
        }
        None => None,
    };
    for name in &options.used_properties {
        session.mark_property_used(name.as_str());
    }
    let goal = parse::parse_goal(&mut session, context, targets)?;
    if let Some(old) = &old {
        goal::transfer_names(&goal, old);
    }
    session.name_goal(&goal).context("cannot name bound variables")?;

    let displayer = Displayer::new(&session)
        .format(options.format)
        .text_depth(options.text_depth);
    Ok(render_goal(&displayer, &goal, old.as_ref()))
}

fn render_goal(displayer: &Displayer, goal: &Goal, old: Option<&Goal>) -> String {
    let mut out = String::new();
    match old {
        Some(old) => {
            let diff = goal.compare(old);
            for (entry, tag) in diff.context.iter().zip(&diff.tags) {
                out.push_str(&format!("{tag} {}\n", displayer.context_entry(entry)));
            }
            out.push_str(&format!("{} ", diff.target_tag));
        }
        None => {
            for entry in &goal.context {
                out.push_str(&displayer.context_entry(entry));
                out.push('\n');
            }
        }
    }
    match goal.target.math_type() {
        Some(target) => out.push_str(&format!("⊢ {}\n", displayer.display(target))),
        None => out.push_str(&format!("⊢ {}\n", displayer.display(&goal.target))),
    }
    out
}
