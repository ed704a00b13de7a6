use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use foundation::math::Vec3;
use gpu::{CameraMatrices, FrameState, HeadlessContext, SceneMode};
use runtime::Frame;
use sensor::{
    AngleLimitedPyramidMesher, RenderResourceCache, ScanPlaneMode, SensorError,
    SensorVolumeOptions,
};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;
use viewshed::{
    Classification, ClassificationCounts, GroundPlane, Occluder, ViewshedConfig, Wall,
    create_viewshed,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Sensor volume and viewshed analysis tools")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Mesh a sensor pyramid and print its buffer sizes as JSON
    Mesh {
        #[arg(long, default_value_t = 20.0)]
        x_half_angle_deg: f64,

        #[arg(long, default_value_t = 20.0)]
        y_half_angle_deg: f64,

        #[arg(long, default_value_t = 32)]
        slices: u32,
    },

    /// Classify a flat z = 0 ground grid around the observer and print an ASCII map
    Viewshed {
        /// Viewshed config (JSON, camelCase keys)
        #[arg(long)]
        config: PathBuf,

        /// Cells per side
        #[arg(long, default_value_t = 41)]
        grid: u32,

        /// Cell size in metres (default: grid spans twice the distance)
        #[arg(long)]
        cell: Option<f64>,

        /// Wall occluder: x0,y0,x1,y1,height
        #[arg(long, value_parser = parse_wall)]
        wall: Vec<WallArg>,
    },
}

#[derive(Debug, Copy, Clone, PartialEq)]
struct WallArg {
    start: (f64, f64),
    end: (f64, f64),
    height: f64,
}

fn parse_wall(raw: &str) -> Result<WallArg, String> {
    let values = raw
        .split(',')
        .map(|v| v.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid wall {raw:?}: {e}"))?;
    let [x0, y0, x1, y1, height] = values[..] else {
        return Err(format!("wall needs 5 values (x0,y0,x1,y1,h): got {}", values.len()));
    };
    if height <= 0.0 {
        return Err(format!("wall height must be > 0: got {height}"));
    }
    Ok(WallArg {
        start: (x0, y0),
        end: (x1, y1),
        height,
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match Args::parse().command {
        Command::Mesh {
            x_half_angle_deg,
            y_half_angle_deg,
            slices,
        } => cmd_mesh(x_half_angle_deg, y_half_angle_deg, slices),
        Command::Viewshed {
            config,
            grid,
            cell,
            wall,
        } => cmd_viewshed(&config, grid, cell, &wall),
    }
}

#[derive(Debug, Serialize)]
struct MeshReport {
    slice_count: u32,
    outline_points: usize,
    sector_vertices: usize,
    sector_line_vertices: usize,
    sector_segment_line_vertices: usize,
    dome_vertices: usize,
    dome_line_vertices: usize,
    scan_plane_vertices: usize,
    bytes: usize,
}

fn cmd_mesh(x_deg: f64, y_deg: f64, slices: u32) -> Result<(), Box<dyn std::error::Error>> {
    let report = mesh_report(x_deg, y_deg, slices)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn mesh_report(x_deg: f64, y_deg: f64, slices: u32) -> Result<MeshReport, SensorError> {
    let options = SensorVolumeOptions {
        x_half_angle: x_deg.to_radians(),
        y_half_angle: y_deg.to_radians(),
        slice_count: slices,
        ..SensorVolumeOptions::default()
    };
    options.validate()?;

    let mesher =
        AngleLimitedPyramidMesher::new(options.x_half_angle, options.y_half_angle, options.slice_count);
    let mesh = mesher.build();
    let dome = mesher.build_dome();
    let scan = mesher.build_scan_plane(ScanPlaneMode::Vertical);

    let bytes = size_of_val(mesh.sector_vertices.as_slice())
        + size_of_val(mesh.sector_line_vertices.as_slice())
        + size_of_val(mesh.sector_segment_line_vertices.as_slice())
        + size_of_val(dome.surface_vertices.as_slice())
        + size_of_val(dome.line_vertices.as_slice())
        + size_of_val(scan.surface_vertices.as_slice());
    Ok(MeshReport {
        slice_count: mesher.slice_count,
        outline_points: mesh.outline.len(),
        sector_vertices: mesh.sector_vertices.len(),
        sector_line_vertices: mesh.sector_line_vertices.len(),
        sector_segment_line_vertices: mesh.sector_segment_line_vertices.len(),
        dome_vertices: dome.surface_vertices.len(),
        dome_line_vertices: dome.line_vertices.len(),
        scan_plane_vertices: scan.surface_vertices.len(),
        bytes,
    })
}

fn cmd_viewshed(
    path: &Path,
    grid: u32,
    cell: Option<f64>,
    walls: &[WallArg],
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = fs::read_to_string(path).map_err(|e| format!("read {path:?}: {e}"))?;
    let config = ViewshedConfig::from_json_str(&raw)?;
    let observer = config
        .observer_position
        .ok_or("config needs observerPosition")?;
    let target = config.target_position.ok_or("config needs targetPosition")?;
    let grid = grid.max(1);
    let cell = cell.unwrap_or(2.0 * config.distance / grid as f64);
    if !(cell.is_finite() && cell > 0.0) {
        return Err(format!("cell size must be > 0: got {cell}").into());
    }

    let mut ctx = HeadlessContext::new();
    let mut cache = RenderResourceCache::new();
    let mut handle = create_viewshed(&mut ctx, config)?;

    let mut occluders: Vec<Box<dyn Occluder>> =
        vec![Box::new(GroundPlane::new(Vec3::ZERO, Vec3::UNIT_Z))];
    for w in walls {
        occluders.push(Box::new(Wall::new(
            Vec3::new(w.start.0, w.start.1, 0.0),
            Vec3::new(w.end.0, w.end.1, 0.0),
            Vec3::UNIT_Z,
            w.height,
        )));
    }
    let depth = handle.render_shadow_depth(&occluders)?;
    info!(size = depth.width(), occluders = occluders.len(), "shadow depth rendered");

    let classifier = handle.classifier(&depth)?;
    let half = grid as f64 * cell * 0.5;
    let cell_of = |p: Vec3| {
        let col = ((p.x - observer.x + half) / cell).floor();
        let row = ((observer.y + half - p.y) / cell).floor();
        (col, row)
    };
    let (observer_cell, target_cell) = (cell_of(observer), cell_of(target));

    let mut counts = ClassificationCounts::default();
    let mut map = String::with_capacity((grid as usize + 1) * grid as usize);
    for row in 0..grid {
        for col in 0..grid {
            let x = observer.x - half + (col as f64 + 0.5) * cell;
            let y = observer.y + half - (row as f64 + 0.5) * cell;
            let c = classifier.classify_world_point(Vec3::new(x, y, 0.0), Some(Vec3::UNIT_Z));
            counts.record(&c);
            let here = (col as f64, row as f64);
            map.push(if here == observer_cell {
                'O'
            } else if here == target_cell {
                'T'
            } else {
                symbol(&c)
            });
        }
        map.push('\n');
    }
    print!("{map}");
    println!("{}", serde_json::to_string_pretty(&counts)?);

    let mut frame_state =
        FrameState::new(SceneMode::Scene3D, Frame::default(), CameraMatrices::default());
    handle.render(&mut ctx, &mut cache, &mut frame_state)?;
    info!(
        commands = frame_state.command_list.len(),
        post_process = frame_state.post_process.len(),
        "viewshed frame recorded"
    );

    handle.destroy(&mut ctx, &mut cache)?;
    Ok(())
}

fn symbol(c: &Classification) -> char {
    match c {
        Classification::Visible => '.',
        Classification::Hidden { .. } => '#',
        _ => ' ',
    }
}

#[cfg(test)]
mod tests {
    use super::{WallArg, mesh_report, parse_wall, symbol};
    use sensor::{MAX_SLICE_COUNT, SensorError};
    use viewshed::Classification;

    #[test]
    fn wall_argument_parses_five_values() {
        assert_eq!(
            parse_wall("25, -10, 25, 10, 80").unwrap(),
            WallArg {
                start: (25.0, -10.0),
                end: (25.0, 10.0),
                height: 80.0,
            }
        );
        assert!(parse_wall("1,2,3").is_err());
        assert!(parse_wall("1,2,3,4,x").is_err());
        assert!(parse_wall("1,2,3,4,0").is_err());
    }

    #[test]
    fn only_classified_cells_get_a_mark() {
        assert_eq!(symbol(&Classification::Visible), '.');
        assert_eq!(symbol(&Classification::Hidden { visibility: 0.5 }), '#');
        assert_eq!(symbol(&Classification::OutsideAngle), ' ');
    }

    #[test]
    fn mesh_report_rejects_out_of_range_input() {
        assert!(matches!(
            mesh_report(-5.0, 20.0, 32),
            Err(SensorError::InvalidHalfAngle { axis: 'x', .. })
        ));
        assert!(matches!(
            mesh_report(20.0, 200.0, 32),
            Err(SensorError::InvalidHalfAngle { axis: 'y', .. })
        ));
        assert!(matches!(mesh_report(20.0, 20.0, 0), Err(SensorError::InvalidSliceCount(0))));
        assert!(matches!(
            mesh_report(20.0, 20.0, MAX_SLICE_COUNT + 1),
            Err(SensorError::InvalidSliceCount(_))
        ));
    }

    #[test]
    fn mesh_report_counts_outline_per_slice() {
        let report = mesh_report(20.0, 10.0, 8).unwrap();
        assert_eq!(report.slice_count, 8);
        assert_eq!(report.outline_points, 32);
        assert!(report.bytes > 0);
    }
}
