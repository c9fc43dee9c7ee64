use std::path::PathBuf;

use anyhow::{Context, Result};
use cgmath::{vec2, Deg};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use locomotion::{
    logging::{self, LogConfig},
    recording::{RecordingFade, RecordingHaptics, RecordingVignetteSink},
    vignette::PerspectiveProjection,
    FrameReport, LocomotionConfig, Services, TargetOutcome, VrAvatar,
};

mod scenario;

use scenario::Scenario;

#[derive(Parser)]
#[command(name = "locomotion_sim")]
#[command(about = "Drive the VR locomotion core through a scripted scenario")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scenario file and print the avatar state after every tick
    Run {
        /// Scenario JSON (geometry, nav mesh and input frames)
        scenario: PathBuf,

        /// Locomotion config JSON, defaults are used when omitted
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print one JSON object per tick instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Print the default locomotion config as JSON
    DefaultConfig,
}

fn init_logging(verbose: bool) {
    let mut config = LogConfig::from_env("LOCOMOTION_LOG");
    if verbose {
        config.set_global_level(tracing::Level::DEBUG);
    }
    logging::install(config);
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            scenario,
            config,
            json,
        } => {
            let config = match config {
                Some(path) => LocomotionConfig::load(&path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => LocomotionConfig::default(),
            };
            let scenario = Scenario::load(&scenario)?;
            handle_run_command(&scenario, config, json)?;
        }
        Commands::DefaultConfig => {
            let config = serde_json::to_string_pretty(&LocomotionConfig::default())?;
            println!("{}", config);
        }
    }

    Ok(())
}

#[derive(Serialize)]
struct FrameRow {
    tick: u64,
    position: [f32; 3],
    speed: f32,
    mode: String,
    writer: Option<String>,
    phase: String,
    target: &'static str,
    climbing: Option<String>,
    arc_segments: usize,
    vignette_radius: Option<f32>,
    vignette_focus: Option<[f32; 2]>,
}

fn target_label(target: &TargetOutcome) -> &'static str {
    match target {
        TargetOutcome::Valid { .. } => "valid",
        TargetOutcome::NoImpact => "no_impact",
        TargetOutcome::SteepSurface => "steep",
        TargetOutcome::OffNavigableSurface => "off_nav",
    }
}

fn frame_row(avatar: &VrAvatar, report: &FrameReport) -> FrameRow {
    let body = avatar.body();
    let position = body.position();
    FrameRow {
        tick: report.tick,
        position: [position.x, position.y, position.z],
        speed: body.speed(),
        mode: format!("{:?}", body.movement_mode()),
        writer: report.pose_writer.map(|w| format!("{:?}", w)),
        phase: format!("{:?}", avatar.teleport().phase()),
        target: target_label(&report.target),
        climbing: avatar.climb().climbing_hand().map(|h| format!("{:?}", h)),
        arc_segments: avatar.teleport().pool().visible_count(),
        vignette_radius: report.vignette.map(|v| v.radius),
        vignette_focus: report.vignette.map(|v| [v.focal_point.x, v.focal_point.y]),
    }
}

fn print_row(row: &FrameRow, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(row)?);
        return Ok(());
    }
    println!(
        "{:>5} pos=({:>8.2}, {:>8.2}, {:>8.2}) speed={:>7.2} {:<8} {:<10} {:<10} {:<9} climb={:<5} segs={:<3} vignette={}",
        row.tick,
        row.position[0],
        row.position[1],
        row.position[2],
        row.speed,
        row.mode,
        row.writer.as_deref().unwrap_or("-"),
        row.phase,
        row.target,
        row.climbing.as_deref().unwrap_or("-"),
        row.arc_segments,
        row.vignette_radius
            .map(|r| format!("{:.2}", r))
            .unwrap_or_else(|| "-".to_string()),
    );
    Ok(())
}

fn handle_run_command(scenario: &Scenario, config: LocomotionConfig, json: bool) -> Result<()> {
    let scene = scenario.build_scene();
    let nav = scenario.build_nav_mesh()?;
    let projection = PerspectiveProjection::new(Deg(90.0), vec2(1832.0, 1920.0));

    let mut fade = RecordingFade::default();
    let mut haptics = RecordingHaptics::default();
    let mut sink = RecordingVignetteSink::default();

    let mut avatar = VrAvatar::new(config, scenario.actor_id, scenario.start_pose())
        .context("Failed to create avatar")?;

    info!(
        colliders = scene.collider_count(),
        nav_polygons = nav.polygon_count(),
        ticks = scenario.tick_count(),
        "Running scenario"
    );

    {
        let mut services = Services {
            ballistic: &scene,
            nav: &nav,
            trace: &scene,
            projection: &projection,
            fade: Some(&mut fade),
            haptics: Some(&mut haptics),
            post_process: Some(&mut sink),
        };

        for frame in &scenario.frames {
            for index in 0..frame.repeat {
                let input = frame.input(index);
                let report = avatar.tick(scenario.dt, &input, &mut services);
                if let Some(position) = report.relocated {
                    info!(?position, tick = report.tick, "Teleported");
                }
                print_row(&frame_row(&avatar, &report), json)?;
            }
        }
    }

    let position = avatar.body().position();
    println!(
        "Finished after {} ticks at ({:.2}, {:.2}, {:.2}): {} fades, {} haptic pulses, {} vignette updates",
        avatar.tick_count(),
        position.x,
        position.y,
        position.z,
        fade.calls.len(),
        haptics.pulses.len(),
        sink.pushed.len()
    );
    Ok(())
}
