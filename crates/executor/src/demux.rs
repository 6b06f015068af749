//! Response demultiplexing: split a batch result back into records.
//!
//! Commands, input blobs and responses have a fixed width per record, so
//! they are cut at multiples of the [`QueryShape`]. Output blobs are not:
//! a `FindImage` with `"blobs": true` returns one blob per matched image,
//! and only the server knows how many matched. The width of each record's
//! output slice is therefore the sum of the `returned` counts of its
//! blob-returning commands, and slicing proceeds from a running cursor.
//!
//! ```text
//! commands:     [Find(3) Add] [Find(0) Add] [Find(2) Add]
//! output blobs: [b b b]       []            [b b]
//! ```

use std::ops::Range;

use parquery_core::{Batch, Blob, Error, Responses, Result};
use tracing::debug;

use crate::{Group, QueryShape};

/// Split a batch result into one [`Group`] per record.
///
/// `index_offset` is the absolute index of the batch's first record; when
/// present, group `i` is labelled `index_offset + i`.
///
/// When fewer output blobs remain than a group needs, that group gets
/// `blobs_out: None` and the cursor still advances by the group's width.
pub fn demultiplex<'a>(
    shape: QueryShape,
    batch: &'a Batch,
    responses: &'a Responses,
    output_blobs: &'a [Blob],
    index_offset: Option<usize>,
) -> Result<Vec<Group<'a>>> {
    groups(shape, batch, responses, output_blobs, index_offset).collect()
}

/// Lazy form of [`demultiplex`].
///
/// Each group's output width is computed only when the group is reached,
/// so a malformed response surfaces at its own group and every earlier
/// group is still yielded. Iteration ends after the first error.
pub fn groups<'a>(
    shape: QueryShape,
    batch: &'a Batch,
    responses: &'a Responses,
    output_blobs: &'a [Blob],
    index_offset: Option<usize>,
) -> Groups<'a> {
    let per_query = shape.commands_per_query.max(1);
    let total = batch.commands.len();
    Groups {
        shape,
        batch,
        responses,
        output_blobs,
        index_offset,
        per_query,
        count: (total + per_query - 1) / per_query,
        next: 0,
        cursor: 0,
    }
}

/// Iterator over the groups of one batch result. See [`groups`].
pub struct Groups<'a> {
    shape: QueryShape,
    batch: &'a Batch,
    responses: &'a Responses,
    output_blobs: &'a [Blob],
    index_offset: Option<usize>,
    per_query: usize,
    count: usize,
    next: usize,
    cursor: usize,
}

impl<'a> Iterator for Groups<'a> {
    type Item = Result<Group<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.count {
            return None;
        }
        let i = self.next;
        let batch = self.batch;
        let commands = clamp(
            i * self.per_query..(i + 1) * self.per_query,
            batch.commands.len(),
        );
        let blobs_in = clamp(
            i * self.shape.blobs_per_query..(i + 1) * self.shape.blobs_per_query,
            batch.blobs.len(),
        );

        let width = match output_width(batch, self.responses, commands.clone()) {
            Ok(width) => width,
            Err(e) => {
                self.next = self.count;
                return Some(Err(e));
            }
        };
        let blobs_out = self.output_blobs.get(self.cursor..self.cursor + width);
        if blobs_out.is_none() {
            debug!(
                target: "parquery::demux",
                group = i,
                needed = width,
                available = self.output_blobs.len().saturating_sub(self.cursor),
                "Output blob stream shorter than group width"
            );
        }
        self.cursor += width;
        self.next += 1;

        Some(Ok(Group {
            commands: &batch.commands[commands.clone()],
            blobs_in: &batch.blobs[blobs_in],
            responses: self.responses.slice(commands),
            blobs_out,
            index: self.index_offset.map(|offset| offset + i),
        }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.count - self.next))
    }
}

/// Number of output blobs owned by the commands in `range`.
fn output_width(batch: &Batch, responses: &Responses, range: Range<usize>) -> Result<usize> {
    let Some(per_command) = responses.per_command() else {
        return Ok(0);
    };
    let mut width = 0usize;
    for (position, (request, response)) in batch.commands[range.clone()]
        .iter()
        .zip(per_command.get(range.start..).unwrap_or_default())
        .enumerate()
        .map(|(offset, pair)| (range.start + offset, pair))
    {
        if !request.returns_blobs() {
            continue;
        }
        let name = request.name().unwrap_or_default();
        let returned = response
            .returned(name)
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| Error::MalformedResponse {
                position,
                reason: format!("{} response has no usable \"returned\" count", name),
            })?;
        width += returned;
    }
    Ok(width)
}

fn clamp(range: Range<usize>, len: usize) -> Range<usize> {
    let end = range.end.min(len);
    range.start.min(end)..end
}
