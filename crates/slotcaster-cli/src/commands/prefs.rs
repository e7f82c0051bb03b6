use std::path::PathBuf;

use clap::Subcommand;
use slotcaster_core::{slots, timezone, Config, UserPreference};

#[derive(Subcommand)]
pub enum PrefsAction {
    /// Print one user's record as JSON
    Show { user: String },
    /// Summarize every stored record
    List,
    /// Stage slots into the pending selection
    Select {
        user: String,
        /// Slot labels ("18:00" ...)
        slots: Vec<String>,
    },
    /// Remove slots from the pending selection
    Unselect { user: String, slots: Vec<String> },
    /// Commit the pending selection
    Commit { user: String },
    /// Abandon the pending selection
    Discard { user: String },
    /// Pause notifications without losing the selection
    Pause { user: String },
    /// Resume notifications
    Resume { user: String },
    /// Clear the selection and reset all flags
    Stop { user: String },
    /// Set the user's timezone (IANA identifier)
    Timezone { user: String, timezone: String },
    /// Toggle whether the selection survives the daily reset
    AutoApply { user: String, enabled: bool },
}

pub fn run(store: Option<PathBuf>, action: PrefsAction) -> Result<(), Box<dyn std::error::Error>> {
    let store = super::open_store(store)?;
    let config = Config::from_env()?;

    match action {
        PrefsAction::Show { user } => {
            let prefs = store.load();
            match prefs.get(&user) {
                Some(pref) => println!("{}", serde_json::to_string_pretty(pref)?),
                None => println!("no record for '{user}'"),
            }
            Ok(())
        }
        PrefsAction::List => {
            let prefs = store.load();
            println!("{:<16}{:<8}{:<8}{:<12}{}", "user", "slots", "paused", "autoApply", "timezone");
            for (user, pref) in &prefs {
                println!(
                    "{:<16}{:<8}{:<8}{:<12}{}",
                    user,
                    pref.selected_slots.len(),
                    pref.paused,
                    pref.auto_apply,
                    pref.timezone
                );
            }
            Ok(())
        }
        PrefsAction::Select { user, slots: labels } => {
            for label in &labels {
                if slots::find(label).is_none() {
                    return Err(format!("unknown slot '{label}'").into());
                }
            }
            mutate(&store, &config, &user, |pref| {
                for label in &labels {
                    pref.stage_slot(label);
                }
            })
        }
        PrefsAction::Unselect { user, slots: labels } => mutate(&store, &config, &user, |pref| {
            for label in &labels {
                pref.unstage_slot(label);
            }
        }),
        PrefsAction::Commit { user } => mutate(&store, &config, &user, |pref| {
            pref.commit_pending();
        }),
        PrefsAction::Discard { user } => mutate(&store, &config, &user, |pref| {
            pref.discard_pending();
        }),
        PrefsAction::Pause { user } => mutate(&store, &config, &user, |pref| {
            pref.set_paused(true);
        }),
        PrefsAction::Resume { user } => mutate(&store, &config, &user, |pref| {
            pref.set_paused(false);
        }),
        PrefsAction::Stop { user } => mutate(&store, &config, &user, |pref| {
            pref.stop();
        }),
        PrefsAction::Timezone { user, timezone: tz } => {
            timezone::parse_tz(&tz)?;
            mutate(&store, &config, &user, |pref| {
                pref.set_timezone(&tz);
            })
        }
        PrefsAction::AutoApply { user, enabled } => mutate(&store, &config, &user, |pref| {
            pref.auto_apply = enabled;
        }),
    }
}

/// Read-modify-write one record, creating it with the deployment default
/// timezone on first interaction, then print the result.
fn mutate<F>(
    store: &slotcaster_core::PrefStore,
    config: &Config,
    user: &str,
    f: F,
) -> Result<(), Box<dyn std::error::Error>>
where
    F: FnOnce(&mut UserPreference),
{
    let mut prefs = store.load();
    let pref = prefs
        .entry(user.to_string())
        .or_insert_with(|| UserPreference::with_timezone(config.reference_tz().to_string()));
    f(pref);
    let snapshot = pref.clone();
    store.save(&prefs)?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}
