//! Container preset catalog
//!
//! Ships the built-in can presets and loads custom containers from
//! `*.container` definition files, one `key = value [unit]` pair per line:
//!
//! ```text
//! # Tall energy drink
//! id = tallboy
//! name = Tall Boy
//! height = 20.4 cm
//! radius = 33 mm
//! empty_mass = 21 g
//! volume = 0.68 l
//! color = 40, 40, 40
//! liquid_color = 250, 220, 80
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use regex::Regex;
use walkdir::WalkDir;

use crate::models::{ContainerSpec, Rgb};

const DEFINITION_EXTENSION: &str = "container";
const DEFAULT_COLOR: Rgb = Rgb(160, 160, 160);
const DEFAULT_LIQUID_COLOR: Rgb = Rgb(120, 180, 255);

#[derive(Debug, Clone)]
pub struct PresetCatalog {
    presets: Vec<ContainerSpec>,
}

impl PresetCatalog {
    /// Red Bull, Monster and Coca-Cola cans
    pub fn builtin() -> Self {
        let presets = vec![
            ContainerSpec {
                id: "redbull".to_string(),
                name: "Red Bull".to_string(),
                height_mm: 168.0,
                radius_mm: 32.0,
                empty_mass_g: 15.0,
                liquid_volume_ml: 473.0,
                color: Rgb(0, 112, 192),
                liquid_color: Rgb(255, 200, 50),
            },
            ContainerSpec {
                id: "monster".to_string(),
                name: "Monster".to_string(),
                height_mm: 178.0,
                radius_mm: 33.0,
                empty_mass_g: 18.0,
                liquid_volume_ml: 500.0,
                color: Rgb(0, 150, 50),
                liquid_color: Rgb(100, 255, 100),
            },
            ContainerSpec {
                id: "cola".to_string(),
                name: "Coca-Cola".to_string(),
                height_mm: 123.0,
                radius_mm: 33.0,
                empty_mass_g: 13.0,
                liquid_volume_ml: 355.0,
                color: Rgb(200, 0, 0),
                liquid_color: Rgb(60, 30, 0),
            },
        ];
        Self { presets }
    }

    /// Look up a preset by id, ignoring case
    pub fn get(&self, id: &str) -> Option<&ContainerSpec> {
        self.presets.iter().find(|p| p.id.eq_ignore_ascii_case(id))
    }

    /// Add a preset, replacing any existing one with the same id.
    /// Returns true if a preset was replaced.
    pub fn insert(&mut self, spec: ContainerSpec) -> bool {
        match self
            .presets
            .iter_mut()
            .find(|p| p.id.eq_ignore_ascii_case(&spec.id))
        {
            Some(existing) => {
                *existing = spec;
                true
            }
            None => {
                self.presets.push(spec);
                false
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContainerSpec> {
        self.presets.iter()
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }
}

/// Find all container definition files below a directory
pub fn find_definition_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        bail!("Preset directory {} does not exist", dir.display());
    }

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == DEFINITION_EXTENSION))
        .collect();
    files.sort();

    Ok(files)
}

/// Parse the text of a container definition
///
/// `fallback_id` is used when the definition has no `id` line.
pub fn parse_container_definition(content: &str, fallback_id: &str) -> Result<ContainerSpec> {
    let line_re = Regex::new(r"^\s*([A-Za-z_]+)\s*=\s*(.*?)\s*$")?;
    let quantity_re = Regex::new(r"^([+-]?\d+(?:\.\d+)?)\s*([A-Za-z]*)$")?;
    let color_re = Regex::new(r"^(\d{1,3})\s*,\s*(\d{1,3})\s*,\s*(\d{1,3})$")?;

    let mut id = None;
    let mut name = None;
    let mut height_mm = None;
    let mut radius_mm = None;
    let mut empty_mass_g = None;
    let mut liquid_volume_ml = None;
    let mut color = DEFAULT_COLOR;
    let mut liquid_color = DEFAULT_LIQUID_COLOR;

    for (lineno, raw) in content.lines().enumerate() {
        let line = raw.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let cap = line_re
            .captures(line)
            .ok_or_else(|| anyhow!("line {}: expected 'key = value'", lineno + 1))?;
        let key = cap[1].to_ascii_lowercase();
        let value = &cap[2];

        let quantity = |unit_scale: fn(&str) -> Option<f64>| -> Result<f64> {
            let q = quantity_re
                .captures(value)
                .ok_or_else(|| anyhow!("line {}: '{}' is not a number", lineno + 1, value))?;
            let number: f64 = q[1].parse()?;
            let scale = unit_scale(&q[2])
                .ok_or_else(|| anyhow!("line {}: unknown unit '{}' for {}", lineno + 1, &q[2], key))?;
            Ok(number * scale)
        };

        match key.as_str() {
            "id" => id = Some(value.to_string()),
            "name" => name = Some(value.to_string()),
            "height" => height_mm = Some(quantity(length_scale)?),
            "radius" => radius_mm = Some(quantity(length_scale)?),
            "diameter" => radius_mm = Some(quantity(length_scale)? / 2.0),
            "empty_mass" => empty_mass_g = Some(quantity(mass_scale)?),
            "volume" => liquid_volume_ml = Some(quantity(volume_scale)?),
            "color" | "liquid_color" => {
                let c = color_re
                    .captures(value)
                    .ok_or_else(|| anyhow!("line {}: expected 'r, g, b' for {}", lineno + 1, key))?;
                let rgb = Rgb(c[1].parse()?, c[2].parse()?, c[3].parse()?);
                if key == "color" {
                    color = rgb;
                } else {
                    liquid_color = rgb;
                }
            }
            other => log::warn!("line {}: ignoring unknown key '{}'", lineno + 1, other),
        }
    }

    let id = id
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback_id.to_string());
    let spec = ContainerSpec {
        name: name.unwrap_or_else(|| id.clone()),
        id,
        height_mm: height_mm.ok_or_else(|| anyhow!("missing 'height'"))?,
        radius_mm: radius_mm.ok_or_else(|| anyhow!("missing 'radius'"))?,
        empty_mass_g: empty_mass_g.ok_or_else(|| anyhow!("missing 'empty_mass'"))?,
        liquid_volume_ml: liquid_volume_ml.ok_or_else(|| anyhow!("missing 'volume'"))?,
        color,
        liquid_color,
    };
    spec.validate()?;

    Ok(spec)
}

fn length_scale(unit: &str) -> Option<f64> {
    match unit.to_ascii_lowercase().as_str() {
        "" | "mm" => Some(1.0),
        "cm" => Some(10.0),
        "m" => Some(1000.0),
        _ => None,
    }
}

fn mass_scale(unit: &str) -> Option<f64> {
    match unit.to_ascii_lowercase().as_str() {
        "" | "g" => Some(1.0),
        "kg" => Some(1000.0),
        _ => None,
    }
}

fn volume_scale(unit: &str) -> Option<f64> {
    match unit.to_ascii_lowercase().as_str() {
        "" | "ml" => Some(1.0),
        "cl" => Some(10.0),
        "l" => Some(1000.0),
        _ => None,
    }
}

fn parse_definition_file(path: &Path) -> Result<ContainerSpec> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let fallback_id = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("custom");
    parse_container_definition(&content, fallback_id)
}

/// Load every definition below `dir` into the catalog
///
/// A file that fails to parse is logged and counted; it never aborts the load.
pub fn load_directory(catalog: &mut PresetCatalog, dir: &Path) -> Result<LoadStats> {
    let mut stats = LoadStats::default();

    let files = find_definition_files(dir)?;
    log::info!("Found {} container definitions in {}", files.len(), dir.display());

    for path in &files {
        match parse_definition_file(path) {
            Ok(spec) => {
                log::debug!(
                    "Loaded {} ({} mm x {} mm, {} g, {} ml)",
                    spec.id,
                    spec.height_mm,
                    spec.radius_mm,
                    spec.empty_mass_g,
                    spec.liquid_volume_ml
                );
                if catalog.insert(spec) {
                    stats.replaced += 1;
                }
                stats.loaded += 1;
            }
            Err(e) => {
                log::warn!("Skipping {}: {:#}", path.display(), e);
                stats.errors += 1;
            }
        }
    }

    Ok(stats)
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct LoadStats {
    pub loaded: usize,
    pub replaced: usize,
    pub errors: usize,
}

impl std::fmt::Display for LoadStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Loaded {} container presets ({} replaced built-ins). Errors: {}",
            self.loaded, self.replaced, self.errors
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("can-stability-{}-{}", std::process::id(), name));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn builtin_catalog_has_three_valid_cans() {
        let catalog = PresetCatalog::builtin();
        assert_eq!(catalog.len(), 3);
        for spec in catalog.iter() {
            assert!(spec.validate().is_ok(), "{} should be valid", spec.id);
        }
        let ids: Vec<&str> = catalog.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["redbull", "monster", "cola"]);
    }

    #[test]
    fn lookup_ignores_case() {
        let catalog = PresetCatalog::builtin();
        assert_eq!(catalog.get("Monster").unwrap().height_mm, 178.0);
        assert!(catalog.get("sprite").is_none());
    }

    #[test]
    fn insert_replaces_same_id() {
        let mut catalog = PresetCatalog::builtin();
        let mut cola = catalog.get("cola").unwrap().clone();
        cola.id = "COLA".to_string();
        cola.height_mm = 200.0;
        assert!(catalog.insert(cola));
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.get("cola").unwrap().height_mm, 200.0);
    }

    #[test]
    fn parses_definition_with_units() {
        let text = "\
# Tall energy drink
id = tallboy
name = Tall Boy
height = 20.4 cm
diameter = 66mm
empty_mass = 0.021 kg
volume = 0.68 l   # nominal
color = 40, 40, 40
";
        let spec = parse_container_definition(text, "ignored").unwrap();
        assert_eq!(spec.id, "tallboy");
        assert_eq!(spec.name, "Tall Boy");
        assert_relative_eq!(spec.height_mm, 204.0, epsilon = 1e-9);
        assert_relative_eq!(spec.radius_mm, 33.0);
        assert_relative_eq!(spec.empty_mass_g, 21.0, epsilon = 1e-9);
        assert_relative_eq!(spec.liquid_volume_ml, 680.0, epsilon = 1e-9);
        assert_eq!(spec.color, Rgb(40, 40, 40));
        assert_eq!(spec.liquid_color, DEFAULT_LIQUID_COLOR);
    }

    #[test]
    fn missing_id_uses_fallback() {
        let text = "height = 100\nradius = 25\nempty_mass = 10\nvolume = 250\n";
        let spec = parse_container_definition(text, "mini").unwrap();
        assert_eq!(spec.id, "mini");
        assert_eq!(spec.name, "mini");
        assert_eq!(spec.color, DEFAULT_COLOR);
    }

    #[test]
    fn rejects_bad_definitions() {
        let missing = "height = 100\nradius = 25\nempty_mass = 10\n";
        let err = parse_container_definition(missing, "x").unwrap_err();
        assert!(err.to_string().contains("volume"));

        let zero_radius = "height = 100\nradius = 0\nempty_mass = 10\nvolume = 1\n";
        assert!(parse_container_definition(zero_radius, "x").is_err());

        let bad_unit = "height = 100 ft\nradius = 25\nempty_mass = 10\nvolume = 1\n";
        let err = parse_container_definition(bad_unit, "x").unwrap_err();
        assert!(err.to_string().contains("unknown unit"));

        let bad_color = "height = 100\nradius = 25\nempty_mass = 10\nvolume = 1\ncolor = 300, 0, 0\n";
        assert!(parse_container_definition(bad_color, "x").is_err());

        assert!(parse_container_definition("just some words", "x").is_err());
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let text = "height = 100\nradius = 25\nempty_mass = 10\nvolume = 250\nbrand = Acme\n";
        assert!(parse_container_definition(text, "acme").is_ok());
    }

    #[test]
    fn loads_directory_recursively() {
        let dir = scratch_dir("load");
        fs::create_dir_all(dir.join("nested")).unwrap();
        fs::write(
            dir.join("mini.container"),
            "height = 90\nradius = 26\nempty_mass = 9\nvolume = 150\n",
        )
        .unwrap();
        fs::write(
            dir.join("nested/cola.container"),
            "id = cola\nname = Cola Slim\nheight = 146\nradius = 29\nempty_mass = 12\nvolume = 330\n",
        )
        .unwrap();
        fs::write(dir.join("nested/broken.container"), "height = tall\n").unwrap();
        fs::write(dir.join("notes.txt"), "height = 1\n").unwrap();

        let mut catalog = PresetCatalog::builtin();
        let stats = load_directory(&mut catalog, &dir).unwrap();
        assert_eq!(
            stats,
            LoadStats {
                loaded: 2,
                replaced: 1,
                errors: 1
            }
        );
        assert_eq!(catalog.len(), 4);
        assert_eq!(catalog.get("mini").unwrap().radius_mm, 26.0);
        assert_eq!(catalog.get("cola").unwrap().name, "Cola Slim");
        assert!(stats.to_string().contains("Errors: 1"));

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn missing_directory_is_an_error() {
        let dir = std::env::temp_dir().join("can-stability-does-not-exist");
        let mut catalog = PresetCatalog::builtin();
        assert!(load_directory(&mut catalog, &dir).is_err());
    }
}
