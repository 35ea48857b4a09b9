use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::sync::{Arc, RwLock};
use std::{collections::HashMap, fs::File, path::Path};

use directories::ProjectDirs;

use crate::opt::*;

const APP_NAME: &str = "edh-draft";
const APP_AUTHOR: &str = "edh-draft";
const APP_QUALIFIER: &str = "com";

const PREFERENCES_FILE_NAME: &str = "preferences.json";

const LAND_COUNT_KEY: &str = "desired_land_count";
const EDHREC_RANK_KEY: &str = "show_edhrec_rank";

/// UI preferences kept between runs. Drafts themselves are never stored.
pub struct AppContext {
    pub data: Arc<RwLock<HashMap<String, String>>>,
    preferences_file_path: String,
}

pub fn create_context() -> Res<AppContext> {
    let project_dirs = ProjectDirs::from(APP_QUALIFIER, APP_AUTHOR, APP_NAME)
        .ok_or("Failed to get the project directory")?;

    let runtime_dir = project_dirs.data_local_dir();
    log_if(
        &format!("Runtime directory: {:?}", runtime_dir),
        DbgFlg::Cli,
    );

    std::fs::create_dir_all(runtime_dir).err_to_str()?;

    let preferences_file_path = runtime_dir.join(PREFERENCES_FILE_NAME);
    let preferences_file_path = preferences_file_path
        .to_str()
        .ok_or("Preferences path is not valid UTF-8")?;
    load_data_from_file(preferences_file_path)
}

pub fn load_data_from_file(preferences_file_path: &str) -> Res<AppContext> {
    let path = Path::new(preferences_file_path);
    let data = if path.exists() {
        let mut file = File::open(path).err_to_str()?;
        let mut contents = String::new();
        file.read_to_string(&mut contents).err_to_str()?;
        if contents.trim().is_empty() {
            HashMap::new()
        } else {
            serde_json::from_str::<HashMap<String, String>>(&contents).err_to_str()?
        }
    } else {
        HashMap::new()
    };

    Ok(AppContext {
        data: Arc::new(RwLock::new(data)),
        preferences_file_path: preferences_file_path.to_string(),
    })
}

impl AppContext {
    pub fn read_data(&self, key: &str) -> Option<String> {
        let data_read = self.data.read().ok()?;
        data_read.get(key).map(|s| s.to_string())
    }

    pub fn write_data(&self, key: &str, value: &str) -> Res<()> {
        let mut data_write = self.data.write().err_to_str()?;
        data_write.insert(key.to_string(), value.to_string());
        save_data(&self.preferences_file_path, &data_write)
    }

    pub fn desired_land_count(&self) -> Option<i64> {
        self.read_data(LAND_COUNT_KEY)?.parse().ok()
    }

    pub fn set_desired_land_count(&self, count: u32) -> Res<()> {
        self.write_data(LAND_COUNT_KEY, &count.to_string())
    }

    pub fn show_edhrec_rank(&self) -> bool {
        self.read_data(EDHREC_RANK_KEY)
            .map_or(false, |value| value == "true")
    }

    pub fn set_show_edhrec_rank(&self, show: bool) -> Res<()> {
        self.write_data(EDHREC_RANK_KEY, &show.to_string())
    }
}

fn save_data(preferences_file_path: &str, data: &HashMap<String, String>) -> Res<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(preferences_file_path)
        .err_to_str()?;
    let content = serde_json::to_string(data).err_to_str()?;
    file.write_all(content.as_bytes()).err_to_str()
}
