use clap::Subcommand;
use slotcaster_core::slots;

#[derive(Subcommand)]
pub enum SlotsAction {
    /// Print the slot catalog
    List,
}

pub fn run(action: SlotsAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        SlotsAction::List => {
            println!("{:<8}{:<12}{}", "slot", "warning", "cron");
            for slot in &slots::SLOTS {
                let rule = slot.warning_rule();
                println!(
                    "{:<8}{:<12}{}",
                    slot.label,
                    format!("{:02}:{:02}", rule.hour, rule.minute),
                    slot.cron_rule()
                );
            }
            Ok(())
        }
    }
}
