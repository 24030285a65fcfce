//! Make sure a runtime image exists locally, pulling it when it does not.

use futures_util::stream::StreamExt;

use super::progress::{ProgressRenderer, ProgressSink};
use crate::engine::ContainerEngine;
use crate::errors::{EngineError, JumpError};

/// Whether the final pull status confirms the image was downloaded.
pub fn pull_confirmed(reference: &str, last_status: &str) -> bool {
    last_status.contains(&format!("Downloaded newer image for {}", reference))
}

pub struct ImageAcquisition<'a, E: ContainerEngine + ?Sized> {
    engine: &'a E,
}

impl<'a, E: ContainerEngine + ?Sized> ImageAcquisition<'a, E> {
    pub fn new(engine: &'a E) -> Self {
        Self { engine }
    }

    /// Whether an image whose primary tag equals `reference` is present locally.
    pub async fn is_present(&self, reference: &str) -> Result<bool, JumpError> {
        let images = self.engine.list_images().await?;
        for image in &images {
            log::debug!("Local image {} {:?}", image.id, image.tags);
        }
        Ok(images
            .iter()
            .any(|image| image.primary_tag() == Some(reference)))
    }

    /// Ensure `reference` is available, rendering pull progress to `sink`.
    ///
    /// Returns `Ok(true)` when the image was already present or the engine
    /// confirmed the download, `Ok(false)` when the pull ended without that
    /// confirmation. Engine failures, engine-reported pull errors and
    /// undecodable events are errors.
    pub async fn ensure_image<S: ProgressSink>(
        &self,
        reference: &str,
        sink: S,
    ) -> Result<bool, JumpError> {
        if self.is_present(reference).await? {
            log::info!("Image {} already exists", reference);
            return Ok(true);
        }

        log::info!("Pulling image {}", reference);
        let mut renderer = ProgressRenderer::new(sink);
        renderer
            .begin()
            .map_err(JumpError::io("Failed to render pull progress"))?;
        let consumed = self.consume_pull(reference, &mut renderer).await;
        let ended = renderer.end();

        let last_status = consumed?;
        ended.map_err(JumpError::io("Failed to restore terminal cursor"))?;

        let confirmed = pull_confirmed(reference, &last_status);
        if !confirmed {
            log::warn!(
                "Pull of {} finished without confirmation, last status: {:?}",
                reference,
                last_status
            );
        }
        Ok(confirmed)
    }

    async fn consume_pull<S: ProgressSink>(
        &self,
        reference: &str,
        renderer: &mut ProgressRenderer<S>,
    ) -> Result<String, JumpError> {
        let mut events = self.engine.pull_image(reference);
        let mut last_status = String::new();

        while let Some(event) = events.next().await {
            let event = event.map_err(|e| match e {
                EngineError::MalformedStream(message) => JumpError::MalformedPullStream(message),
                other => JumpError::Engine(other),
            })?;

            if let Some(reason) = event.error {
                return Err(JumpError::PullFailed {
                    image: reference.to_string(),
                    reason,
                });
            }

            renderer
                .render(&event)
                .map_err(JumpError::io("Failed to render pull progress"))?;
            last_status = event.status;
        }

        Ok(last_status)
    }
}
