//! Mock Audio Output for Testing

use avatalk::audio::AudioOut;
use std::path::Path;
use std::sync::Mutex;

#[derive(Debug, Default)]
pub struct MockAudioOut {
    pub log: Mutex<Vec<String>>,
}

impl MockAudioOut {
    pub fn log_snapshot(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.log.lock().unwrap().iter().any(|l| l == entry)
    }
}

impl AudioOut for MockAudioOut {
    fn play_file(&self, path: &Path) {
        self.log
            .lock()
            .unwrap()
            .push(format!("file:{}", path.display()));
    }

    fn play_speech(&self, bytes: Vec<u8>) {
        self.log
            .lock()
            .unwrap()
            .push(format!("speech:{}", bytes.len()));
    }

    fn stop(&self) {
        self.log.lock().unwrap().push("stop".to_string());
    }

    fn set_volume(&self, volume: f32) {
        self.log
            .lock()
            .unwrap()
            .push(format!("volume:{:.1}", volume));
    }
}
