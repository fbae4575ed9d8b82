//! Drives one refinement run: builds the workflow graph from the
//! abstract workflow, derives the file movements every compute job
//! needs, and feeds them to the selected refinement strategy in level
//! order.

use std::collections::HashMap;
use std::sync::Arc;

use crate::api::workflow_dto::{JobDto, LinkDto, WorkflowDto};
use crate::error::Result;
use crate::planner::dag::Dag;
use crate::planner::file_transfer::FileTransfer;
use crate::planner::job::{Job, JobType};
use crate::planner::properties::PlannerProperties;
use crate::planner::site_store::SiteStore;
use crate::planner::transfer::implementation::GenericTransfer;
use crate::planner::transfer::refiner::{Advisory, RefinerBag, RefinerType};
use crate::planner::transfer::replica_bridge::{ReplicaCatalogBridge, SimpleReplicaCatalogBridge};

/// The outcome of a refinement run: the executable workflow graph with
/// all data movement jobs wired in, plus the advisories the strategy
/// collected along the way.
pub struct RefinedWorkflow {
    pub name: String,
    pub dag: Dag,
    pub advisories: Vec<Advisory>,
}

pub struct TransferEngine {
    properties: Arc<PlannerProperties>,
    site_store: Arc<SiteStore>,
}

fn site_url(site: &str, lfn: &str) -> String {
    format!("gsiftp://{}/{}", site, lfn)
}

fn staging_site_of(job_dto: &JobDto) -> &str {
    job_dto.staging_site.as_deref().unwrap_or(&job_dto.site)
}

impl TransferEngine {
    pub fn new(properties: Arc<PlannerProperties>, site_store: Arc<SiteStore>) -> Self {
        TransferEngine { properties, site_store }
    }

    /// Builds the graph of compute jobs and control dependencies and
    /// assigns every job its level.
    fn build_dag(&self, workflow: &WorkflowDto) -> Result<Dag> {
        let mut dag = Dag::new();
        for job_dto in &workflow.jobs {
            let mut job = Job::new(job_dto.id.clone(), job_dto.site.clone(), JobType::Compute);
            if let Some(staging) = &job_dto.staging_site {
                job.staging_site_handle = staging.clone();
            }
            job.profiles = job_dto.profiles.clone();
            job.priority = job.base_priority()?;
            dag.add_job(job)?;
        }
        for dependency in &workflow.dependencies {
            dag.add_edge(&dependency.parent, &dependency.child)?;
        }
        dag.compute_levels()?;
        Ok(dag)
    }

    /// Runs the refinement strategy over the workflow and returns the
    /// executable graph.
    pub fn refine(
        &self,
        workflow: &WorkflowDto,
        refiner_type: RefinerType,
    ) -> Result<RefinedWorkflow> {
        let mut dag = self.build_dag(workflow)?;

        let bag = RefinerBag {
            site_store: Arc::clone(&self.site_store),
            properties: Arc::clone(&self.properties),
            stage_in_implementation: Arc::new(GenericTransfer::default()),
            symlink_implementation: Arc::new(GenericTransfer::new(true)),
            inter_site_implementation: Arc::new(GenericTransfer::default()),
            stage_out_implementation: Arc::new(GenericTransfer::default()),
        };
        let mut refiner = refiner_type.get_instance(&dag, bag)?;
        let rcb: Arc<dyn ReplicaCatalogBridge> = Arc::new(SimpleReplicaCatalogBridge);
        if !self.properties.create_registration_jobs {
            log::info!("Replica registration jobs are disabled for this run");
        }
        log::info!(
            "Refining workflow {} using strategy: {}",
            workflow.name,
            refiner.description()
        );

        // which job produces each logical file
        let mut producers: HashMap<&str, &JobDto> = HashMap::new();
        for job_dto in &workflow.jobs {
            for file_use in &job_dto.uses {
                if file_use.link == LinkDto::Output {
                    producers.insert(file_use.lfn.as_str(), job_dto);
                }
            }
        }
        let dto_by_id: HashMap<&str, &JobDto> =
            workflow.jobs.iter().map(|job| (job.id.as_str(), job)).collect();

        // the per-level strategies rely on never seeing a level twice,
        // so the traversal walks compute jobs sorted by level
        let mut compute_jobs: Vec<Job> = dag
            .jobs()
            .filter(|job| job.job_type == JobType::Compute)
            .cloned()
            .collect();
        compute_jobs.sort_by_key(|job| job.level);

        for job in &compute_jobs {
            let job_dto = match dto_by_id.get(job.name.as_str()) {
                Some(job_dto) => *job_dto,
                None => continue,
            };
            let staging = job.staging_site_handle.as_str();

            let mut stage_in_files: Vec<FileTransfer> = Vec::new();
            let mut symlink_files: Vec<FileTransfer> = Vec::new();
            let mut inter_site_files: Vec<FileTransfer> = Vec::new();
            let mut stage_out_files: Vec<FileTransfer> = Vec::new();

            for file_use in &job_dto.uses {
                match file_use.link {
                    LinkDto::Input => {
                        let producer = producers
                            .get(file_use.lfn.as_str())
                            .copied()
                            .filter(|producer| producer.id != job.name);

                        if let Some(producer) = producer {
                            let producer_staging = staging_site_of(producer);
                            if producer_staging == staging {
                                // already materialized at the shared
                                // staging site by the producing job
                                continue;
                            }
                            let mut ft = FileTransfer::new(&file_use.lfn, &producer.id);
                            ft.executable = file_use.executable;
                            ft.add_source(producer_staging, site_url(producer_staging, &file_use.lfn));
                            ft.add_dest(staging, site_url(staging, &file_use.lfn));
                            inter_site_files.push(ft);
                        } else {
                            let mut ft = FileTransfer::new(&file_use.lfn, &job.name);
                            ft.executable = file_use.executable;
                            for source in &file_use.sources {
                                ft.add_source(&source.site, &source.url);
                            }
                            if ft.sources.is_empty() {
                                log::warn!(
                                    "No replica location known for {}, assuming the local site",
                                    file_use.lfn
                                );
                                ft.add_source("local", site_url("local", &file_use.lfn));
                            }
                            ft.add_dest(staging, site_url(staging, &file_use.lfn));

                            // a replica already on the staging site can be
                            // symlinked in place of a copy
                            match ft.sources.iter().position(|source| source.site == staging) {
                                Some(position) => {
                                    ft.sources.swap(0, position);
                                    symlink_files.push(ft);
                                }
                                None => stage_in_files.push(ft),
                            }
                        }
                    }
                    LinkDto::Output => {
                        let mut ft = FileTransfer::new(&file_use.lfn, &job.name);
                        ft.transient_transfer = !file_use.transfer;
                        ft.register = file_use.register;
                        ft.add_source(staging, site_url(staging, &file_use.lfn));
                        ft.add_dest(
                            &workflow.output_site,
                            site_url(&workflow.output_site, &file_use.lfn),
                        );
                        stage_out_files.push(ft);
                    }
                }
            }

            if !stage_in_files.is_empty() || !symlink_files.is_empty() {
                refiner.add_stage_in_nodes(&mut dag, job, stage_in_files, symlink_files)?;
            }
            if !inter_site_files.is_empty() {
                refiner.add_inter_site_nodes(&mut dag, job, inter_site_files, true)?;
            }
            if !stage_out_files.is_empty() {
                refiner.add_stage_out_nodes(
                    &mut dag,
                    job,
                    stage_out_files,
                    Arc::clone(&rcb),
                    true,
                    false,
                )?;
            }
        }

        let advisories = refiner.done(&mut dag)?;
        for advisory in &advisories {
            log::info!("{}", advisory.message);
        }
        log::info!(
            "Refined workflow {} has {} jobs and {} edges",
            workflow.name,
            dag.size(),
            dag.edge_count()
        );

        Ok(RefinedWorkflow { name: workflow.name.clone(), dag, advisories })
    }
}
