use anyhow::Context;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use std::path::Path;

use arcane_core::abilities::{AbilityLibrary, SpawnPoint};
use arcane_core::config::CombatConfig;
use arcane_core::health::Health;
use arcane_core::logging::{self, LoggingPlugin, TimingSpan};
use arcane_core::slots::{AbilitySlots, LocalAuthority};
use arcane_core::ArcaneCorePlugin;

const CONFIG_PATH: &str = "config/combat.ron";
const ABILITIES_PATH: &str = "config/abilities.ron";

fn main() -> anyhow::Result<()> {
    // before the app exists so config loading is logged
    logging::init_tracing_default();

    let (config, library) = {
        let _span = TimingSpan::new("load_config");
        let config = CombatConfig::load_or_default(CONFIG_PATH)
            .with_context(|| format!("loading {}", CONFIG_PATH))?;
        let library = if Path::new(ABILITIES_PATH).exists() {
            AbilityLibrary::load(ABILITIES_PATH)
                .with_context(|| format!("loading {}", ABILITIES_PATH))?
        } else {
            warn!("No ability library at {}, using builtin abilities", ABILITIES_PATH);
            AbilityLibrary::builtin()
        };
        (config, library)
    };

    let exit = App::new()
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "Arcane Combat".into(),
                        resolution: (1280., 720.).into(),
                        ..default()
                    }),
                    ..default()
                })
                .disable::<LogPlugin>(),
        )
        .add_plugins(LoggingPlugin)
        .add_plugins(RapierPhysicsPlugin::<NoUserData>::default())
        .add_plugins(ArcaneCorePlugin {
            config: Some(config),
            library: Some(library),
        })
        .add_systems(Startup, setup)
        .run();

    if let AppExit::Error(code) = exit {
        anyhow::bail!("combat sandbox exited with code {}", code);
    }
    Ok(())
}

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    config: Res<CombatConfig>,
    library: Res<AbilityLibrary>,
) {
    // Camera
    commands.spawn((
        Camera3d::default(),
        Transform::from_xyz(0.0, 12.0, 14.0).looking_at(Vec3::new(0.0, 0.0, -4.0), Vec3::Y),
    ));

    // Light
    commands.spawn((
        DirectionalLight {
            illuminance: 10000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_rotation(Quat::from_euler(EulerRot::XYZ, -0.8, 0.4, 0.0)),
    ));

    // Ground
    commands.spawn((
        Name::new("Ground"),
        Mesh3d(meshes.add(Plane3d::default().mesh().size(40.0, 40.0))),
        MeshMaterial3d(materials.add(Color::srgb(0.3, 0.35, 0.3))),
        Transform::default(),
        RigidBody::Fixed,
        Collider::cuboid(20.0, 0.05, 20.0),
    ));

    // Caster
    let body = meshes.add(Capsule3d::new(0.4, 1.0));
    commands.spawn((
        Name::new("Caster"),
        Mesh3d(body.clone()),
        MeshMaterial3d(materials.add(Color::srgb(0.2, 0.4, 0.9))),
        Transform::from_xyz(0.0, 0.9, 0.0),
        RigidBody::KinematicPositionBased,
        Collider::capsule_y(0.5, 0.4),
        AbilitySlots::from_config(&config, &library, LocalAuthority(true)),
        SpawnPoint::default(),
        Health::new(100),
    ));

    // Target dummies
    let dummy_material = materials.add(Color::srgb(0.8, 0.3, 0.2));
    for (i, x) in [-3.0, 0.0, 3.0].into_iter().enumerate() {
        commands.spawn((
            Name::new(format!("Dummy {}", i)),
            Mesh3d(body.clone()),
            MeshMaterial3d(dummy_material.clone()),
            Transform::from_xyz(x, 0.9, -6.0),
            RigidBody::KinematicPositionBased,
            Collider::capsule_y(0.5, 0.4),
            Health::new(50),
        ));
    }

    info!("Arcane combat sandbox ready: LMB/Q/E/R/F/T trigger slots");
}
