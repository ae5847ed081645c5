//! Common test utilities for packlet CLI scenarios.
//!
//! - `TestProject`: isolated project directory plus helpers to run the binary
//! - `vue_leaflet()`: a small component library shaped like vue-leaflet

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;

/// Result of running the packlet binary
#[derive(Debug)]
pub struct TestResult {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl TestResult {
    pub fn combined_output(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }
}

/// Isolated project directory
pub struct TestProject {
    pub dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp project"),
        }
    }

    /// Project with the vue-leaflet style fixture and default configuration
    pub fn vue_leaflet() -> Self {
        let project = Self::new();
        for (path, content) in VUE_LEAFLET {
            project.write(path, content);
        }
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dirs");
        }
        fs::write(path, content).expect("write fixture file");
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative))
            .unwrap_or_else(|e| panic!("read {}: {}", relative, e))
    }

    /// Sorted artifact names in `dist/` (dotfiles such as the build lock are
    /// skipped); empty when the directory does not exist
    pub fn dist_files(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.path("dist")) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|name| !name.starts_with('.'))
            .collect();
        names.sort();
        names
    }

    /// Run packlet from the project root
    pub fn run(&self, args: &[&str]) -> TestResult {
        self.run_with_env(args, &[])
    }

    pub fn run_with_env(&self, args: &[&str], env_vars: &[(&str, &str)]) -> TestResult {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_packlet"));
        cmd.current_dir(self.root())
            .args(args)
            .env_remove("PACKLET_OUT_DIR")
            .env_remove("PACKLET_FORMATS")
            .env_remove("PACKLET_DTS")
            .env_remove("PACKLET_LOG");
        for (key, value) in env_vars {
            cmd.env(key, value);
        }
        let output = cmd.output().expect("failed to execute packlet");
        TestResult {
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }
}

impl Default for TestProject {
    fn default() -> Self {
        Self::new()
    }
}

pub const VUE_LEAFLET: &[(&str, &str)] = &[
    (
        "src/index.ts",
        r#"import type { App } from 'vue';
import LMap from './components/LMap.vue';
import LMarker from './components/LMarker.vue';
import { debounce, propsBinder } from './utils';
import defaults from './defaults.json';
import 'leaflet/dist/leaflet.css';

export * from './types';
export { debounce, propsBinder, defaults };
export { LMap, LMarker };

export function install(app: App): void {
  app.component('LMap', LMap);
  app.component('LMarker', LMarker);
}

export default install;
"#,
    ),
    (
        "src/utils.ts",
        r#"import { watch } from 'vue';
import type { Ref } from 'vue';

export function debounce(fn: (...args: any[]) => void, time: number): (...args: any[]) => void {
  let timeout: number | undefined;
  return (...args: any[]) => {
    if (timeout) clearTimeout(timeout);
    timeout = setTimeout(() => fn(...args), time);
  };
}

export function propsBinder(target: Ref<any>, props: Record<string, unknown>): void {
  for (const key of Object.keys(props)) {
    watch(() => props[key], (value) => {
      target.value[key] = value;
    });
  }
}
"#,
    ),
    (
        "src/types.ts",
        r#"export interface MapOptions {
  zoom: number;
  center: [number, number];
}

export type LayerType = 'base' | 'overlay';
"#,
    ),
    (
        "src/defaults.json",
        r#"{ "zoom": 3, "maxZoom": 18 }
"#,
    ),
    (
        "src/components/LMap.vue",
        r#"<template>
  <div class="l-map"><slot /></div>
</template>

<script lang="ts">
import { defineComponent, ref } from 'vue';
import { map } from 'leaflet';
import type { MapOptions } from '../types';

export default defineComponent({
  name: 'LMap',
  props: { zoom: { type: Number, default: 3 } },
  setup(props: Partial<MapOptions>) {
    const root = ref(null);
    return { root, create: (el: HTMLElement) => map(el, props) };
  },
});
</script>

<style>
.l-map { height: 100%; }
</style>
"#,
    ),
    (
        "src/components/LMarker.vue",
        r#"<template>
  <div class="l-marker" />
</template>

<script lang="ts">
import { defineComponent } from 'vue';
import { marker } from 'leaflet/src/layer/marker';

export default defineComponent({
  name: 'LMarker',
  setup() {
    return { create: (latlng: [number, number]) => marker(latlng) };
  },
});
</script>
"#,
    ),
];
