use clap::Parser;

use transfer_planner::logger;
use transfer_planner::planner::job::JobType;

/// Adds the data movement jobs an abstract workflow needs to run.
#[derive(Parser, Debug)]
#[command(name = "transfer-planner", version, about)]
struct Args {
    /// Path to the abstract workflow JSON file.
    workflow: String,

    /// Path to the site catalog JSON file.
    #[arg(long)]
    site_catalog: Option<String>,

    /// Path to the planner properties JSON file.
    #[arg(long)]
    properties: Option<String>,

    /// Transfer refiner to use, overriding the properties file.
    #[arg(long)]
    refiner: Option<String>,
}

fn main() {
    logger::init();
    let args = Args::parse();

    let refined = match transfer_planner::refine_workflow(
        &args.workflow,
        args.site_catalog.as_deref(),
        args.properties.as_deref(),
        args.refiner.as_deref(),
    ) {
        Ok(refined) => refined,
        Err(e) => {
            log::error!("Refinement failed: {}", e);
            std::process::exit(1);
        }
    };

    let count = |job_type: JobType| {
        refined.dag.jobs().filter(|job| job.job_type == job_type).count()
    };
    println!("Workflow {} refined:", refined.name);
    println!("  jobs total      {}", refined.dag.size());
    println!("  compute         {}", count(JobType::Compute));
    println!("  stage-in        {}", count(JobType::StageIn));
    println!("  stage-out       {}", count(JobType::StageOut));
    println!("  inter-site      {}", count(JobType::InterSite));
    println!("  permission-fix  {}", count(JobType::SetXBit));
    println!("  registration    {}", count(JobType::Registration));
    println!("  edges           {}", refined.dag.edge_count());

    if !refined.advisories.is_empty() {
        println!("Advisories:");
        for advisory in &refined.advisories {
            println!("  - {}", advisory.message);
        }
    }
}
