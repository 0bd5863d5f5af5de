use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use tracing::{error, info, warn};

use crate::models::challenge::{Challenge, ChallengeSummary};

/// Read-only catalogue of challenge definitions, loaded from a directory of
/// JSON files once at startup.
pub struct ChallengeStore {
    challenges: BTreeMap<String, Challenge>,
}

const STARTER_CHALLENGE: &str = r##"{
    "id": "hello-world",
    "title": "Hello, World",
    "difficulty": "beginner",
    "description": "Welcome to your first C programming challenge! Write a simple C program that prints the message 'Hello, World!' to the console.\n\nThis is the traditional first program for beginners in any programming language, and it will help you verify that your development environment is set up correctly.",
    "hints": [
        "Use the printf function from the stdio.h library to output text",
        "Don't forget to include the stdio.h header at the top of your program",
        "Remember that your main function should return an integer (typically 0 for successful execution)",
        "In C, strings need to be enclosed in double quotes"
    ],
    "testCases": [
        {
            "id": "test1",
            "input": "",
            "expectedOutput": "Hello, World!",
            "hidden": false
        }
    ],
    "initialCode": "#include <stdio.h>\n\nint main() {\n    // Write your code here\n    \n    return 0;\n}",
    "solutions": [
        "#include <stdio.h>\n\nint main() {\n    printf(\"Hello, World!\");\n    return 0;\n}"
    ],
    "timeLimit": 1,
    "memoryLimit": 128
}"##;

impl ChallengeStore {
    pub fn load(dir: &Path) -> Self {
        info!(dir = %dir.display(), "loading challenges");

        let mut challenges = read_challenge_dir(dir);
        if challenges.is_empty() {
            info!("no challenges found, seeding starter challenge");
            match seed_starter_challenge(dir) {
                Ok(()) => challenges = read_challenge_dir(dir),
                Err(err) => error!(?err, dir = %dir.display(), "failed to seed starter challenge"),
            }
        }

        Self { challenges }
    }

    #[cfg(test)]
    pub fn from_challenges(challenges: impl IntoIterator<Item = Challenge>) -> Self {
        Self {
            challenges: challenges
                .into_iter()
                .map(|c| (c.id.clone(), c))
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Challenge> {
        self.challenges.get(id)
    }

    pub fn summaries(&self) -> BTreeMap<String, ChallengeSummary> {
        self.challenges
            .iter()
            .map(|(id, challenge)| {
                (
                    id.clone(),
                    ChallengeSummary {
                        id: challenge.id.clone(),
                        title: challenge.title.clone(),
                    },
                )
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.challenges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.challenges.is_empty()
    }
}

fn read_challenge_dir(dir: &Path) -> BTreeMap<String, Challenge> {
    let mut challenges = BTreeMap::new();

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            error!(?err, dir = %dir.display(), "failed to read challenges directory");
            return challenges;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }

        let data = match fs::read_to_string(&path) {
            Ok(data) => data,
            Err(err) => {
                warn!(?err, file = %path.display(), "failed to read challenge file");
                continue;
            }
        };

        let mut challenge: Challenge = match serde_json::from_str(&data) {
            Ok(challenge) => challenge,
            Err(err) => {
                warn!(?err, file = %path.display(), "invalid challenge json");
                continue;
            }
        };

        if challenge.id.is_empty() {
            challenge.id = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or_default()
                .to_string();
        }

        info!(id = %challenge.id, title = %challenge.title, file = %path.display(), "loaded challenge");
        challenges.insert(challenge.id.clone(), challenge);
    }

    challenges
}

fn seed_starter_challenge(dir: &Path) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    let path = dir.join("hello-world.json");
    fs::write(&path, STARTER_CHALLENGE)?;
    info!(file = %path.display(), "created starter challenge");
    Ok(())
}
