use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::info;
use nalgebra::Vector3;

use sylva::algo::{
    BSphereComputer, PolygonComputer, SerializeOptions, SurfComputer, Tessellator,
    serialize_scene,
};
use sylva::scene::{
    Appearance, Color3, Geometry, GeometryKind, Material, Scene, Shape, TriangleSet,
};

/// Scene-graph demo tool
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    cmd: Command,

    /// Built-in scene to operate on
    #[clap(short, long, value_enum, default_value_t = SceneKind::Simple)]
    scene: SceneKind,
}

#[derive(Subcommand)]
enum Command {
    /// Serialize the scene into an encoded mesh stream
    Encode {
        /// Name of a file to write
        #[clap(short, long)]
        out: PathBuf,

        /// Speed/ratio trade-off, 0 (densest) to 10 (fastest)
        #[clap(short, long, default_value_t = 5)]
        speed: i32,

        /// Flatten everything into one mesh instead of instancing
        #[clap(long)]
        single_mesh: bool,
    },

    /// Print scene measurements as JSON
    Stats,

    /// Tessellate the scene and write a binary STL
    Stl {
        /// Name of a `.stl` file to write
        #[clap(short, long)]
        out: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy)]
enum SceneKind {
    /// A box and a cone, distinct materials
    Simple,
    /// One sphere shared under many translations
    Instanced,
    /// Parametric surfaces: paraboloid and surface of revolution
    Parametric,
}

fn build_scene(kind: SceneKind) -> Scene {
    match kind {
        SceneKind::Simple => {
            let mut scene = Scene::new();
            scene.add(Shape::new(
                Geometry::box3(Vector3::new(1.0, 1.0, 1.0)),
                Appearance::Material(Material::with_ambient(Color3::new(160, 80, 20))),
            ));
            scene.add(Shape::new(
                Geometry::translated(Vector3::new(3.0, 0.0, 0.0), Geometry::cone(1.0, 2.0)),
                Appearance::Material(Material::with_ambient(Color3::new(30, 120, 30))),
            ));
            scene
        }
        SceneKind::Instanced => {
            let crown = Geometry::sphere(1.0);
            let mut scene = Scene::new();
            for i in 0..5 {
                for j in 0..5 {
                    let at = Vector3::new(i as f32 * 3.0, j as f32 * 3.0, 2.0);
                    scene.add(Shape::new(
                        Geometry::translated(at, crown.clone()),
                        Appearance::Material(Material::with_ambient(Color3::new(
                            30,
                            100 + (i * 20) as u8,
                            30,
                        ))),
                    ));
                }
            }
            scene
        }
        SceneKind::Parametric => {
            use nalgebra::Point2;
            let mut scene = Scene::new();
            scene.add(Shape::untextured(Geometry::new(GeometryKind::Paraboloid(
                sylva::scene::Paraboloid {
                    radius: 2.0,
                    height: 3.0,
                    shape: 2.0,
                    solid: true,
                    slices: 16,
                    stacks: 8,
                },
            ))));
            scene.add(Shape::untextured(Geometry::new(GeometryKind::Revolution(
                sylva::scene::Revolution {
                    profile: vec![
                        Point2::new(1.0, 0.0),
                        Point2::new(1.5, 1.0),
                        Point2::new(0.8, 2.0),
                    ],
                    slices: 16,
                },
            ))));
            scene
        }
    }
}

/// Tessellates every shape and merges the triangles
fn flatten(scene: &Scene) -> Result<TriangleSet> {
    let mut tess = Tessellator::new();
    let mut out = TriangleSet {
        points: Vec::new(),
        indices: Vec::new(),
        tex_coords: None,
    };
    for shape in scene.shapes() {
        let tri = tess.tessellate(&shape.geometry)?;
        let GeometryKind::TriangleSet(t) = tri.kind() else {
            unreachable!();
        };
        let base = out.points.len() as u32;
        out.points.extend_from_slice(&t.points);
        out.indices
            .extend(t.indices.iter().map(|[a, b, c]| [a + base, b + base, c + base]));
    }
    Ok(out)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let scene = build_scene(args.scene);

    match args.cmd {
        Command::Encode {
            out,
            speed,
            single_mesh,
        } => {
            let start = Instant::now();
            let options = SerializeOptions { speed, single_mesh };
            let serialized = serialize_scene(&scene, &options)?;
            info!(
                "encoded {} buffers ({} bytes) in {:?}",
                serialized.len(),
                serialized.data().len(),
                start.elapsed()
            );
            std::fs::write(&out, serialized.data())?;
            info!("wrote {out:?}");
        }
        Command::Stats => {
            let bsphere = BSphereComputer::new().process_scene(&scene)?;
            let area = SurfComputer::new().process_scene(&scene)?;
            let polygons = PolygonComputer::new().process_scene(&scene)?;
            let stats = serde_json::json!({
                "shapes": scene.len(),
                "polygons": polygons,
                "surface_area": area,
                "bounding_sphere": bsphere,
            });
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Command::Stl { out } => {
            let start = Instant::now();
            let mesh = flatten(&scene)?;
            info!(
                "tessellated {} triangles in {:?}",
                mesh.indices.len(),
                start.elapsed()
            );
            let mut file = std::fs::File::create(&out)?;
            mesh.write_stl(&mut file)?;
            info!("wrote {out:?}");
        }
    }
    Ok(())
}
