use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    admissions: AtomicU64,
    admission_rejections: AtomicU64,
    check_ins: AtomicU64,
    verification_rejections: AtomicU64,
    tampered_credentials: AtomicU64,
}

impl Metrics {
    pub fn record_admission(&self) {
        self.admissions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_admission_rejection(&self) {
        self.admission_rejections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_check_in(&self) {
        self.check_ins.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_verification_rejection(&self, tampered: bool) {
        self.verification_rejections.fetch_add(1, Ordering::Relaxed);
        if tampered {
            self.tampered_credentials.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn render_prometheus(&self) -> String {
        let admissions = self.admissions.load(Ordering::Relaxed);
        let rejections = self.admission_rejections.load(Ordering::Relaxed);
        let check_ins = self.check_ins.load(Ordering::Relaxed);
        let verification = self.verification_rejections.load(Ordering::Relaxed);
        let tampered = self.tampered_credentials.load(Ordering::Relaxed);

        format!(
            "# TYPE checkin_admissions_total counter\n\
checkin_admissions_total {}\n\
# TYPE checkin_admission_rejections_total counter\n\
checkin_admission_rejections_total {}\n\
# TYPE checkin_check_ins_total counter\n\
checkin_check_ins_total {}\n\
# TYPE checkin_verification_rejections_total counter\n\
checkin_verification_rejections_total {}\n\
# TYPE checkin_tampered_credentials_total counter\n\
checkin_tampered_credentials_total {}\n",
            admissions, rejections, check_ins, verification, tampered
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tampered_rejections_count_twice() {
        let metrics = Metrics::default();
        metrics.record_verification_rejection(true);
        metrics.record_verification_rejection(false);
        let text = metrics.render_prometheus();
        assert!(text.contains("checkin_verification_rejections_total 2\n"));
        assert!(text.contains("checkin_tampered_credentials_total 1\n"));
    }
}
