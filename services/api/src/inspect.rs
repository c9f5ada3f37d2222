use carelink::compliance::catalog::{self, requirements_for_services, Applicability};
use carelink::compliance::classifier::classify;
use carelink::compliance::steps::{fallback_steps, generate_steps, SetupStep};
use carelink::domain::DocumentCategory;
use carelink::error::AppError;
use clap::Args;

#[derive(Args, Debug)]
pub(crate) struct StepsArgs {
    /// Service code the worker offers; repeat for several services
    #[arg(long = "service")]
    pub(crate) services: Vec<String>,
    /// Emit the steps as JSON instead of a listing
    #[arg(long)]
    pub(crate) json: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ClassifyArgs {
    /// Requirement type, e.g. `police-check` or `nursing:registration`
    pub(crate) requirement_type: String,
    /// Document category stored with the requirement
    #[arg(long, value_parser = crate::infra::parse_category)]
    pub(crate) category: Option<DocumentCategory>,
}

pub(crate) fn run_catalog() {
    println!("Document catalog");
    for document in catalog::documents() {
        let applies = match document.applies {
            Applicability::Always => "every worker".to_string(),
            Applicability::AnyService(codes) => codes.join(", "),
        };
        println!(
            "  {:<28} {:<40} {:?} ({applies})",
            document.id, document.name, document.group
        );
    }

    println!("\nServices");
    for service in catalog::services() {
        println!("  {} - {}", service.code, service.title);
        for qualification in service.qualifications {
            println!(
                "    {}:{:<24} {}",
                service.code, qualification.doc_type, qualification.name
            );
        }
    }
}

pub(crate) fn run_steps(args: StepsArgs) -> Result<(), AppError> {
    let StepsArgs { services, json } = args;

    let unknown: Vec<&str> = services
        .iter()
        .map(String::as_str)
        .filter(|code| catalog::service(code).is_none())
        .collect();
    if !unknown.is_empty() {
        eprintln!("ignoring unknown services: {}", unknown.join(", "));
    }

    let requirements = requirements_for_services(&services);
    let steps = if requirements.is_empty() {
        fallback_steps()
    } else {
        generate_steps(&requirements)
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&steps)?);
    } else {
        render_steps(&steps, requirements.len());
    }
    Ok(())
}

fn render_steps(steps: &[SetupStep], requirement_count: usize) {
    println!("Onboarding wizard ({requirement_count} requirements)");
    for (index, step) in steps.iter().enumerate() {
        println!(
            "{:>3}. {:<32} {:?}",
            index + 1,
            step.slug,
            step.component
        );
        if let Some(requirement) = &step.metadata.requirement {
            println!("       collects {requirement}");
        }
        for covered in &step.metadata.covers {
            println!("       - {covered}");
        }
    }
}

pub(crate) fn run_classify(args: ClassifyArgs) {
    let bucket = classify(&args.requirement_type, args.category);
    println!("{} -> {}", args.requirement_type, bucket.label());
}
