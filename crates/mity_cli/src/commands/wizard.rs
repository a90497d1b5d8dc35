//! Interactive wizard driver.

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use mity_wizard::{
    ClientConfig, CheckpointWriter, HttpApi, ProjectMode, SpecMethod, Step, WizardContext,
    WizardController, WizardError, WizardExit,
};

use super::{chat, checkpoint_store};
use crate::prompt::{InputClosed, Prompt};

/// Drive the wizard on the terminal until it finishes or input closes.
pub async fn run(ctx: WizardContext, config: &ClientConfig) -> Result<()> {
    let api = Arc::new(HttpApi::new(&config.server_url));
    let writer = CheckpointWriter::spawn(checkpoint_store(config));
    let mut wizard = WizardController::new(ctx, api.clone(), api, writer.clone())
        .with_yolo_mode(config.yolo_mode);
    let mut prompt = Prompt::new();

    let result = drive(&mut wizard, &mut prompt, config).await;
    writer.flush().await;

    match result {
        Ok(()) => {
            print_exit(wizard.exit());
            Ok(())
        }
        Err(e) if e.downcast_ref::<InputClosed>().is_some() => {
            if let (Some(project), true) = (wizard.project_name(), wizard.context().has_checkpoint) {
                println!();
                println!("💾 Progress saved. Continue with: mity resume {}", project);
            }
            Err(e)
        }
        Err(e) => Err(e),
    }
}

async fn drive(wizard: &mut WizardController, prompt: &mut Prompt, config: &ClientConfig) -> Result<()> {
    while !wizard.is_finished() {
        debug!(step = %wizard.step(), "Prompting for step");
        let outcome = match wizard.step() {
            Step::Mode => mode_step(wizard, prompt).await?,
            Step::Details => details_step(wizard, prompt).await?,
            Step::Method => method_step(wizard, prompt).await?,
            Step::Chat => {
                chat::run(wizard, prompt, config).await?;
                Ok(wizard.step())
            }
            Step::Complete => break,
        };

        if let Err(e) = outcome {
            report(wizard, &e);
        }
    }
    Ok(())
}

async fn mode_step(wizard: &mut WizardController, prompt: &mut Prompt) -> Result<Result<Step, WizardError>> {
    println!();
    let answer = prompt
        .ask("Create a [n]ew project or register an [e]xisting repository?")
        .await?;
    let mode = match answer.to_lowercase().as_str() {
        "n" | "new" => ProjectMode::New,
        "e" | "existing" => ProjectMode::Existing,
        _ => {
            println!("Please answer 'n' or 'e'.");
            return Ok(Ok(Step::Mode));
        }
    };
    Ok(wizard.select_mode(mode))
}

async fn details_step(wizard: &mut WizardController, prompt: &mut Prompt) -> Result<Result<Step, WizardError>> {
    println!();
    println!("Project details (type /back to return)");

    let name = prompt.ask("  Project name:").await?;
    if name == "/back" {
        return Ok(wizard.back());
    }
    let repo_url = prompt.ask("  Repository URL:").await?;
    if repo_url == "/back" {
        return Ok(wizard.back());
    }

    Ok(wizard.submit_details(&name, &repo_url).await)
}

async fn method_step(wizard: &mut WizardController, prompt: &mut Prompt) -> Result<Result<Step, WizardError>> {
    println!();
    let answer = prompt
        .ask("Write the spec [a]ssisted by the agent or [m]anually? (/back)")
        .await?;
    let method = match answer.to_lowercase().as_str() {
        "/back" => return Ok(wizard.back()),
        "a" | "assisted" => SpecMethod::Assisted,
        "m" | "manual" => SpecMethod::Manual,
        _ => {
            println!("Please answer 'a' or 'm'.");
            return Ok(Ok(Step::Method));
        }
    };
    Ok(wizard.choose_method(method).await)
}

/// Print a recoverable wizard failure.
pub fn report(wizard: &WizardController, error: &WizardError) {
    match error {
        WizardError::Validation(fields) => {
            if let Some(message) = &fields.project_name {
                println!("   ❌ Project name: {}", message);
            }
            if let Some(message) = &fields.repo_url {
                println!("   ❌ Repository URL: {}", message);
            }
        }
        _ => match wizard.step_error() {
            Some(step_error) => println!("   ❌ {} (step {})", step_error.message, step_error.step),
            None => println!("   ❌ {}", error),
        },
    }
}

fn print_exit(exit: Option<&WizardExit>) {
    match exit {
        Some(WizardExit::Completed {
            project,
            spec_method,
            spec_path,
        }) => {
            println!();
            println!("✅ Project {} is ready", project);
            if let Some(path) = spec_path {
                println!("   Spec: {}", path);
            }
            if *spec_method == Some(SpecMethod::Manual) {
                println!("   Write your spec files, then start the agent from the project view.");
            }
        }
        Some(WizardExit::ExitedToProject { project }) => {
            println!();
            println!("📂 Opening project {}", project);
        }
        None => {}
    }
}
