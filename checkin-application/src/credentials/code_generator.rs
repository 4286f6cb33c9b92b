use rand::Rng;
use tracing::{debug, warn};

use checkin_domain::{RegistrationCode, RegistrationRepository};

use crate::settings::DEFAULT_CODE_ATTEMPTS;
use crate::AppError;

/// Draws random codes until one is not taken. Bounded; fails closed.
#[derive(Debug, Clone, Copy)]
pub struct CodeGenerator {
    max_attempts: u32,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_CODE_ATTEMPTS)
    }
}

impl CodeGenerator {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn random_code() -> RegistrationCode {
        let mut rng = rand::thread_rng();
        RegistrationCode::generate_with(|bound| rng.gen_range(0..bound))
    }

    pub async fn generate(
        &self,
        registrations: &dyn RegistrationRepository,
    ) -> Result<RegistrationCode, AppError> {
        self.generate_with(registrations, Self::random_code).await
    }

    pub async fn generate_with(
        &self,
        registrations: &dyn RegistrationRepository,
        mut draw: impl FnMut() -> RegistrationCode + Send,
    ) -> Result<RegistrationCode, AppError> {
        for attempt in 1..=self.max_attempts {
            let code = draw();
            let taken = registrations.code_exists(&code).await?;
            if !taken {
                return Ok(code);
            }
            debug!(attempt, "registration code collision, drawing again");
        }
        warn!(
            attempts = self.max_attempts,
            "registration code generation exhausted"
        );
        Err(AppError::StorageUnavailable(format!(
            "no unique registration code after {} attempts",
            self.max_attempts
        )))
    }
}
